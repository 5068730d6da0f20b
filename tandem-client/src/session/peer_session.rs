use crate::error::SessionError;
use crate::media::LocalMedia;
use crate::session::{SessionEventSink, SessionId};
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{IceCandidate, SessionDescription};

/// Which descriptions a session has committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionState {
    Absent,
    LocalOnly,
    RemoteOnly,
    Complete,
}

impl DescriptionState {
    pub fn from_flags(local: bool, remote: bool) -> Self {
        match (local, remote) {
            (false, false) => Self::Absent,
            (true, false) => Self::LocalOnly,
            (false, true) => Self::RemoteOnly,
            (true, true) => Self::Complete,
        }
    }

    pub fn has_remote(self) -> bool {
        matches!(self, Self::RemoteOnly | Self::Complete)
    }

    pub fn has_local(self) -> bool {
        matches!(self, Self::LocalOnly | Self::Complete)
    }
}

/// One negotiation resource for one call attempt. A session is never
/// renegotiated: each description side is committed at most once.
#[async_trait]
pub trait PeerSession: Send + Sync {
    fn id(&self) -> SessionId;

    /// Adds the local tracks to the session. Must precede offer or answer
    /// creation for the tracks to be negotiated.
    async fn attach_media(&self, media: &LocalMedia) -> Result<(), SessionError>;

    /// Produces and commits a local offer.
    async fn create_offer(&self) -> Result<SessionDescription, SessionError>;

    /// Commits `offer` as the remote description, then produces and commits
    /// a matching answer.
    async fn create_answer(
        &self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, SessionError>;

    /// Commits a remote description.
    async fn apply_remote_description(&self, desc: SessionDescription) -> Result<(), SessionError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SessionError>;

    /// Releases every resource held by the session. Idempotent.
    async fn close(&self) -> Result<(), SessionError>;

    async fn description_state(&self) -> DescriptionState;
}

/// Builds fresh sessions wired to the given sink.
#[async_trait]
pub trait PeerSessionFactory: Send + Sync {
    async fn create(&self, sink: SessionEventSink) -> Result<Arc<dyn PeerSession>, SessionError>;
}
