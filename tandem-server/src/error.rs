use tandem_core::{ConnectionId, RoomId};
use thiserror::Error;

/// Local decisions taken by the registries. None of these are ever
/// propagated to connections other than the one that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("room {room_id} is full")]
    RoomFull { room_id: RoomId },

    #[error("connection {0} is not attached")]
    UnknownConnection(ConnectionId),
}

impl RegistryError {
    pub fn room_full(room_id: &RoomId) -> Self {
        Self::RoomFull {
            room_id: room_id.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("relay router is not running")]
    RouterClosed,
}
