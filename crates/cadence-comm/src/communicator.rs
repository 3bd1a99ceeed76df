//! The [`Communicator`] capability.

use cadence_core::CollectiveError;

use crate::op::{ReduceOp, ReduceTarget, Reducible, Scalar};

/// Ordered point-to-point transport plus the collectives built on it.
///
/// # Contract
///
/// - Messages between one ordered pair of ranks arrive in send order.
/// - `send_to` never blocks waiting for the receiver.
/// - Every rank issues the same collectives in the same order. A
///   collective that a peer never joins blocks forever unless the peer
///   drops its endpoint, which surfaces as
///   [`CollectiveError::PeerDisconnected`].
///
/// Reductions fold contributions in rank order, so a `Sum` yields
/// bit-identical results on every receiving rank.
pub trait Communicator: Send {
    /// This rank's index in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Send a message to `dest`.
    fn send_to(&self, dest: usize, msg: Vec<Scalar>) -> Result<(), CollectiveError>;

    /// Receive the next message from `source`.
    fn recv_from(&self, source: usize) -> Result<Vec<Scalar>, CollectiveError>;

    /// Block until every rank has entered the barrier.
    fn barrier(&self) -> Result<(), CollectiveError> {
        let (me, size) = (self.rank(), self.size());
        if size == 1 {
            return Ok(());
        }
        if me == 0 {
            for peer in 1..size {
                self.recv_from(peer)?;
            }
            for peer in 1..size {
                self.send_to(peer, Vec::new())?;
            }
        } else {
            self.send_to(0, Vec::new())?;
            self.recv_from(0)?;
        }
        Ok(())
    }

    /// Collect every rank's contribution, indexed by rank, on every rank.
    fn all_gather<T: Reducible>(&self, local: &[T]) -> Result<Vec<Vec<T>>, CollectiveError> {
        let (me, size) = (self.rank(), self.size());
        let msg: Vec<Scalar> = local.iter().map(|v| v.into_scalar()).collect();
        for peer in (0..size).filter(|&p| p != me) {
            self.send_to(peer, msg.clone())?;
        }
        let mut gathered = Vec::with_capacity(size);
        for peer in 0..size {
            if peer == me {
                gathered.push(local.to_vec());
            } else {
                gathered.push(decode(self.recv_from(peer)?)?);
            }
        }
        Ok(gathered)
    }

    /// Elementwise reduction of `values` across all ranks.
    ///
    /// Returns `Some(result)` on the receiving rank(s) and `None` on every
    /// other rank. All ranks must contribute the same number of values.
    fn reduce<T: Reducible>(
        &self,
        values: &[T],
        op: ReduceOp,
        target: ReduceTarget,
    ) -> Result<Option<Vec<T>>, CollectiveError> {
        let (me, size) = (self.rank(), self.size());
        match target {
            ReduceTarget::All => {
                let gathered = self.all_gather(values)?;
                fold(values.len(), gathered, op).map(Some)
            }
            ReduceTarget::Root(root) => {
                if root >= size {
                    return Err(CollectiveError::InvalidRoot { root, size });
                }
                if me != root {
                    self.send_to(root, values.iter().map(|v| v.into_scalar()).collect())?;
                    return Ok(None);
                }
                let mut gathered = Vec::with_capacity(size);
                for peer in 0..size {
                    if peer == me {
                        gathered.push(values.to_vec());
                    } else {
                        gathered.push(decode(self.recv_from(peer)?)?);
                    }
                }
                fold(values.len(), gathered, op).map(Some)
            }
        }
    }

    /// Reduce a single value to every rank.
    fn all_reduce_one<T: Reducible>(&self, value: T, op: ReduceOp) -> Result<T, CollectiveError> {
        let reduced = self.reduce(&[value], op, ReduceTarget::All)?;
        Ok(reduced.map_or(value, |v| v[0]))
    }
}

fn decode<T: Reducible>(msg: Vec<Scalar>) -> Result<Vec<T>, CollectiveError> {
    msg.into_iter()
        .map(|s| T::from_scalar(s).ok_or(CollectiveError::TypeMismatch))
        .collect()
}

fn fold<T: Reducible>(
    expected: usize,
    gathered: Vec<Vec<T>>,
    op: ReduceOp,
) -> Result<Vec<T>, CollectiveError> {
    let mut contributions = gathered.into_iter();
    let mut acc = contributions.next().unwrap_or_default();
    if acc.len() != expected {
        return Err(CollectiveError::LengthMismatch {
            expected,
            got: acc.len(),
        });
    }
    for contribution in contributions {
        if contribution.len() != expected {
            return Err(CollectiveError::LengthMismatch {
                expected,
                got: contribution.len(),
            });
        }
        for (a, b) in acc.iter_mut().zip(contribution) {
            *a = a.combine(b, op);
        }
    }
    Ok(acc)
}
