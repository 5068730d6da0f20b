use std::collections::HashMap;
use tandem_core::{ConnectionId, RoomId, ServerMessage};
use tokio::sync::mpsc;

/// A live client connection: its outbound queue and the room it sits in.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    outbox: mpsc::UnboundedSender<ServerMessage>,
    room: Option<RoomId>,
}

impl Connection {
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    /// Queues `message` without waiting on the peer. Returns `false` when
    /// the socket side has already gone away.
    pub fn deliver(&self, message: ServerMessage) -> bool {
        self.outbox.send(message).is_ok()
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, id: ConnectionId, outbox: mpsc::UnboundedSender<ServerMessage>) {
        let connection = Connection {
            id: id.clone(),
            outbox,
            room: None,
        };
        self.connections.insert(id, connection);
    }

    /// Removes the connection. Room membership must be cleaned up by the
    /// caller through [`crate::RoomRegistry::leave`] first.
    pub fn detach(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn is_live(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn room_of(&self, id: &ConnectionId) -> Option<RoomId> {
        self.connections.get(id).and_then(|c| c.room.clone())
    }

    pub(crate) fn set_room(&mut self, id: &ConnectionId, room: Option<RoomId>) {
        if let Some(connection) = self.connections.get_mut(id) {
            connection.room = room;
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
