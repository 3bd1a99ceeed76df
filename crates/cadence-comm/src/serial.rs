//! Single-rank communicator.

use cadence_core::CollectiveError;

use crate::communicator::Communicator;
use crate::op::Scalar;

/// The communicator of a run with exactly one rank.
///
/// Every collective completes immediately with the local contribution.
/// Point-to-point transport has no peers and always fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send_to(&self, dest: usize, _msg: Vec<Scalar>) -> Result<(), CollectiveError> {
        Err(CollectiveError::PeerDisconnected { rank: dest })
    }

    fn recv_from(&self, source: usize) -> Result<Vec<Scalar>, CollectiveError> {
        Err(CollectiveError::PeerDisconnected { rank: source })
    }
}
