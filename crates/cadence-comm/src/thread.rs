//! In-process ranks connected by crossbeam channels.
//!
//! [`ThreadComm::group`] wires `n` endpoints with one unbounded channel
//! per ordered rank pair, giving per-pair FIFO delivery. Each endpoint is
//! moved onto its own thread and used exactly like a distributed rank.

use crossbeam_channel::{Receiver, Sender};

use cadence_core::CollectiveError;

use crate::communicator::Communicator;
use crate::op::Scalar;

/// One rank's endpoint in an in-process communicator group.
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    /// Indexed by destination rank; `None` at our own index.
    senders: Vec<Option<Sender<Vec<Scalar>>>>,
    /// Indexed by source rank; `None` at our own index.
    receivers: Vec<Option<Receiver<Vec<Scalar>>>>,
}

impl ThreadComm {
    /// Create a fully connected group of `size` ranks.
    ///
    /// The returned endpoints are ordered by rank.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let mut senders: Vec<Vec<Option<Sender<Vec<Scalar>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Vec<Scalar>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for src in 0..size {
            for dst in (0..size).filter(|&d| d != src) {
                let (tx, rx) = crossbeam_channel::unbounded();
                senders[src][dst] = Some(tx);
                receivers[dst][src] = Some(rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| ThreadComm {
                rank,
                size,
                senders,
                receivers,
            })
            .collect()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send_to(&self, dest: usize, msg: Vec<Scalar>) -> Result<(), CollectiveError> {
        let tx = self
            .senders
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or(CollectiveError::PeerDisconnected { rank: dest })?;
        tx.send(msg)
            .map_err(|_| CollectiveError::PeerDisconnected { rank: dest })
    }

    fn recv_from(&self, source: usize) -> Result<Vec<Scalar>, CollectiveError> {
        let rx = self
            .receivers
            .get(source)
            .and_then(Option::as_ref)
            .ok_or(CollectiveError::PeerDisconnected { rank: source })?;
        rx.recv()
            .map_err(|_| CollectiveError::PeerDisconnected { rank: source })
    }
}
