use crate::negotiation::NegotiationState;
use tandem_core::{ConnectionId, RoomId};
use thiserror::Error;

/// Errors surfaced to the UI. Cheap to clone so they can ride inside
/// [`crate::CallEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("local media unavailable: {0}")]
    MediaUnavailable(String),

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("peer {0} is no longer reachable")]
    RelayDropped(ConnectionId),

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: NegotiationState,
    },

    #[error("call actor or signaling channel is closed")]
    ChannelClosed,
}

impl CallError {
    pub fn negotiation(msg: impl Into<String>) -> Self {
        Self::Negotiation(msg.into())
    }

    pub fn invalid_state(operation: &'static str, state: NegotiationState) -> Self {
        Self::InvalidState { operation, state }
    }
}

/// Failures of a single peer session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("webrtc: {0}")]
    Rtc(#[from] webrtc::Error),

    #[error("a local description is already committed")]
    LocalDescriptionCommitted,

    #[error("a remote description is already committed")]
    RemoteDescriptionCommitted,

    #[error("malformed session input: {0}")]
    Malformed(String),

    #[error("session is closed")]
    Closed,
}

impl From<SessionError> for CallError {
    fn from(e: SessionError) -> Self {
        CallError::Negotiation(e.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Malformed(e.to_string())
    }
}
