use crate::model::connection::ConnectionId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Messages a client sends to the signaling server.
///
/// Offer, answer and candidate payloads are opaque to the server and are
/// forwarded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId },
    CallUser { to: ConnectionId, offer: Value },
    MakeAnswer { to: ConnectionId, answer: Value },
    IceCandidate { to: ConnectionId, candidate: Value },
}

/// Messages the signaling server pushes to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    RoomFull {},
    UserJoined { id: ConnectionId },
    CallMade { from: ConnectionId, offer: Value },
    AnswerMade { from: ConnectionId, answer: Value },
    IceCandidate { from: ConnectionId, candidate: Value },
    PeerUnavailable { id: ConnectionId },
}

/// The three message kinds the server relays between room members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayKind {
    Offer,
    Answer,
    Candidate,
}

impl fmt::Display for RelayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayKind::Offer => "call-user",
            RelayKind::Answer => "make-answer",
            RelayKind::Candidate => "ice-candidate",
        };
        f.write_str(name)
    }
}

impl ClientMessage {
    /// Splits a relayable message into kind, target and payload.
    /// Returns `None` for `join-room`, which is handled by room membership.
    pub fn into_relay(self) -> Option<(RelayKind, ConnectionId, Value)> {
        match self {
            ClientMessage::JoinRoom { .. } => None,
            ClientMessage::CallUser { to, offer } => Some((RelayKind::Offer, to, offer)),
            ClientMessage::MakeAnswer { to, answer } => Some((RelayKind::Answer, to, answer)),
            ClientMessage::IceCandidate { to, candidate } => {
                Some((RelayKind::Candidate, to, candidate))
            }
        }
    }
}

impl ServerMessage {
    pub fn relayed(kind: RelayKind, from: ConnectionId, payload: Value) -> Self {
        match kind {
            RelayKind::Offer => ServerMessage::CallMade {
                from,
                offer: payload,
            },
            RelayKind::Answer => ServerMessage::AnswerMade {
                from,
                answer: payload,
            },
            RelayKind::Candidate => ServerMessage::IceCandidate {
                from,
                candidate: payload,
            },
        }
    }
}
