use std::collections::VecDeque;
use tandem_core::{ConnectionId, IceCandidate};

/// What to do with a remote candidate right now.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    ApplyNow(IceCandidate),
    Queued { depth: usize },
}

/// Holds remote candidates until the remote description is committed.
///
/// The gate starts closed. [`open`](Self::open) hands back everything
/// queued so far, in arrival order, exactly once; from then on every
/// admitted candidate is applied immediately. Queued entries remember their
/// sender so a new attempt can keep only the ones meant for it.
#[derive(Debug, Default)]
pub struct PendingCandidateQueue {
    pending: VecDeque<(ConnectionId, IceCandidate)>,
    open: bool,
}

impl PendingCandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, from: ConnectionId, candidate: IceCandidate) -> Admission {
        if self.open {
            return Admission::ApplyNow(candidate);
        }
        self.pending.push_back((from, candidate));
        Admission::Queued {
            depth: self.pending.len(),
        }
    }

    /// Opens the gate and drains the backlog. Later calls return nothing.
    pub fn open(&mut self) -> Vec<IceCandidate> {
        self.open = true;
        self.pending.drain(..).map(|(_, c)| c).collect()
    }

    /// Removes and returns the backlog from `from`, in arrival order.
    pub fn take_from(&mut self, from: &ConnectionId) -> Vec<IceCandidate> {
        let (taken, kept): (VecDeque<_>, VecDeque<_>) =
            self.pending.drain(..).partition(|(sender, _)| sender == from);
        self.pending = kept;
        taken.into_iter().map(|(_, c)| c).collect()
    }

    /// Drops the backlog without opening the gate. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
