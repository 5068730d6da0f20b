use crate::media::RemoteTrack;
use std::fmt;
use tandem_core::IceCandidate;
use tokio::sync::mpsc;

/// Identifies one peer session. Never reused within a negotiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Transport-level connectivity of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Callbacks raised by a peer session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    LocalCandidate(IceCandidate),
    RemoteTrack(RemoteTrack),
    ConnectionState(LinkState),
}

/// Where a session reports its callbacks. Events are tagged with the
/// session id so a negotiator can ignore sessions it already released.
#[derive(Debug, Clone)]
pub struct SessionEventSink {
    session_id: SessionId,
    tx: mpsc::UnboundedSender<(SessionId, SessionEvent)>,
}

impl SessionEventSink {
    pub fn new(session_id: SessionId, tx: mpsc::UnboundedSender<(SessionId, SessionEvent)>) -> Self {
        Self { session_id, tx }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns `false` once the receiving side is gone.
    pub fn emit(&self, event: SessionEvent) -> bool {
        self.tx.send((self.session_id, event)).is_ok()
    }
}
