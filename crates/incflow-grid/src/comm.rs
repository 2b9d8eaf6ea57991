//! Collectives and point-to-point messages across workers.
//!
//! Every global quantity the integrator consumes (velocity extrema for
//! the step size, norms for the steady-state test) is a local value
//! folded across workers by an all-reduce. Halo exchange between boxes
//! owned by different workers uses [`Communicator::send`] and
//! [`Communicator::recv`]. All collectives are blocking: every worker
//! must reach them in the same order or the group deadlocks.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::CommError;

/// Collective and point-to-point operations over a fixed group of workers.
pub trait Communicator: Send {
    /// This worker's rank in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// Global maximum of `value` across the group.
    fn all_reduce_max(&self, value: f64) -> Result<f64, CommError>;

    /// Global sum of `value` across the group.
    ///
    /// Sums are folded in rank order so every run produces the same bits.
    fn all_reduce_sum(&self, value: f64) -> Result<f64, CommError>;

    /// Queue `data` for worker `to`.
    ///
    /// Returns without waiting for the matching [`recv`](Self::recv), so
    /// a worker may post all its sends before receiving.
    fn send(&self, to: usize, data: Vec<f64>) -> Result<(), CommError>;

    /// Next message worker `from` sent to this worker, in send order.
    fn recv(&self, from: usize) -> Result<Vec<f64>, CommError>;

    /// Block until every worker arrives.
    fn barrier(&self) -> Result<(), CommError> {
        self.all_reduce_max(0.0).map(|_| ())
    }
}

/// Single-worker communicator: every reduction is the identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalComm;

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_max(&self, value: f64) -> Result<f64, CommError> {
        Ok(value)
    }

    fn all_reduce_sum(&self, value: f64) -> Result<f64, CommError> {
        Ok(value)
    }

    fn send(&self, to: usize, _data: Vec<f64>) -> Result<(), CommError> {
        Err(CommError::NoPeer { rank: 0, peer: to })
    }

    fn recv(&self, from: usize) -> Result<Vec<f64>, CommError> {
        Err(CommError::NoPeer { rank: 0, peer: from })
    }
}

#[derive(Clone, Copy)]
enum ReduceOp {
    Max,
    Sum,
}

impl ReduceOp {
    fn name(self) -> &'static str {
        match self {
            Self::Max => "all_reduce_max",
            Self::Sum => "all_reduce_sum",
        }
    }

    fn fold(self, values: &[f64]) -> f64 {
        match self {
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Sum => values.iter().sum(),
        }
    }
}

/// In-process communicator for a group of worker threads.
///
/// Every ordered pair of workers has its own channel, and only the
/// sending worker holds its end. A worker that drops its communicator
/// (for instance after leaving a step early with an error) therefore
/// disconnects every peer that waits on it, and the failure spreads
/// through the group instead of blocking it.
///
/// Reductions gather to rank 0 in rank order, fold, and broadcast.
/// Created as a full group with [`ChannelComm::group`]; move one member
/// into each worker thread.
pub struct ChannelComm {
    rank: usize,
    size: usize,
    /// `outbox[peer]` sends to `peer`; empty at this worker's own slot.
    outbox: Vec<Option<Sender<Vec<f64>>>>,
    /// `inbox[peer]` receives from `peer`; empty at this worker's own slot.
    inbox: Vec<Option<Receiver<Vec<f64>>>>,
}

impl ChannelComm {
    /// Create a connected group of `size` communicators.
    ///
    /// Returns an empty vector when `size` is zero.
    pub fn group(size: usize) -> Vec<ChannelComm> {
        let mut outboxes: Vec<Vec<Option<Sender<Vec<f64>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut inboxes: Vec<Vec<Option<Receiver<Vec<f64>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        for from in 0..size {
            for to in (0..size).filter(|&to| to != from) {
                let (tx, rx) = unbounded();
                outboxes[from][to] = Some(tx);
                inboxes[to][from] = Some(rx);
            }
        }
        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outbox, inbox))| ChannelComm {
                rank,
                size,
                outbox,
                inbox,
            })
            .collect()
    }

    fn post(&self, to: usize, data: Vec<f64>, op: &'static str) -> Result<(), CommError> {
        let tx = self
            .outbox
            .get(to)
            .and_then(Option::as_ref)
            .ok_or(CommError::NoPeer {
                rank: self.rank,
                peer: to,
            })?;
        tx.send(data).map_err(|_| CommError::Disconnected {
            rank: self.rank,
            op,
        })
    }

    fn take(&self, from: usize, op: &'static str) -> Result<Vec<f64>, CommError> {
        let rx = self
            .inbox
            .get(from)
            .and_then(Option::as_ref)
            .ok_or(CommError::NoPeer {
                rank: self.rank,
                peer: from,
            })?;
        rx.recv().map_err(|_| CommError::Disconnected {
            rank: self.rank,
            op,
        })
    }

    fn take_scalar(&self, from: usize, op: &'static str) -> Result<f64, CommError> {
        match self.take(from, op)?.as_slice() {
            [v] => Ok(*v),
            other => Err(CommError::MessageSize {
                rank: self.rank,
                peer: from,
                expected: 1,
                found: other.len(),
            }),
        }
    }

    fn reduce(&self, value: f64, op: ReduceOp) -> Result<f64, CommError> {
        let name = op.name();
        if self.rank != 0 {
            self.post(0, vec![value], name)?;
            return self.take_scalar(0, name);
        }
        let mut values = Vec::with_capacity(self.size);
        values.push(value);
        for peer in 1..self.size {
            values.push(self.take_scalar(peer, name)?);
        }
        let result = op.fold(&values);
        for peer in 1..self.size {
            self.post(peer, vec![result], name)?;
        }
        Ok(result)
    }
}

impl Communicator for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce_max(&self, value: f64) -> Result<f64, CommError> {
        self.reduce(value, ReduceOp::Max)
    }

    fn all_reduce_sum(&self, value: f64) -> Result<f64, CommError> {
        self.reduce(value, ReduceOp::Sum)
    }

    fn send(&self, to: usize, data: Vec<f64>) -> Result<(), CommError> {
        self.post(to, data, "send")
    }

    fn recv(&self, from: usize) -> Result<Vec<f64>, CommError> {
        self.take(from, "recv")
    }
}
