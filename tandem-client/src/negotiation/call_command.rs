use crate::error::CallError;
use crate::media::{RemoteTrack, TrackKind};
use crate::negotiation::NegotiationState;
use crate::session::{LinkState, SessionId};
use tandem_core::{ConnectionId, RoomId};
use tokio::sync::oneshot;

/// Commands accepted by the negotiator.
#[derive(Debug)]
pub enum CallCommand {
    JoinRoom(RoomId),
    InitiateCall {
        target: ConnectionId,
        reply: oneshot::Sender<Result<(), CallError>>,
    },
    EndCall,
    SetTrackEnabled {
        kind: TrackKind,
        enabled: bool,
    },
    Inspect(oneshot::Sender<CallSnapshot>),
}

/// Notifications for the UI.
#[derive(Debug, Clone)]
pub enum CallEvent {
    StateChanged(NegotiationState),
    PeerJoined(ConnectionId),
    RoomFull(RoomId),
    RemoteTrack(RemoteTrack),
    ConnectionStateChanged(LinkState),
    Error(CallError),
}

/// Point-in-time view of the negotiator.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSnapshot {
    pub state: NegotiationState,
    /// Bumped on every reset; step results from older attempts are dropped.
    pub attempt: u64,
    pub session_id: Option<SessionId>,
    pub pending_candidates: usize,
    pub remote_id: Option<ConnectionId>,
    /// Last peer announced by `user-joined`.
    pub known_peer: Option<ConnectionId>,
    pub room: Option<RoomId>,
    pub holds_local_media: bool,
    pub remote_tracks: usize,
}
