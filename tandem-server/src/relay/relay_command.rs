use tandem_core::{ClientMessage, ConnectionId, RoomId, ServerMessage};
use tokio::sync::{mpsc, oneshot};

/// Commands fed into the relay router by the transport layer.
#[derive(Debug)]
pub enum RelayCommand {
    /// A new socket was accepted and given an id.
    Attach {
        connection_id: ConnectionId,
        outbox: mpsc::UnboundedSender<ServerMessage>,
    },

    /// A decoded frame from an attached connection.
    Message {
        connection_id: ConnectionId,
        message: ClientMessage,
    },

    /// The socket closed.
    Detach { connection_id: ConnectionId },

    /// Current members of a room, in join order.
    RoomMembers {
        room_id: RoomId,
        reply: oneshot::Sender<Vec<ConnectionId>>,
    },
}
