use crate::error::RegistryError;
use crate::room::ConnectionRegistry;
use std::collections::HashMap;
use tandem_core::utils::ROOM_CAPACITY;
use tandem_core::{ConnectionId, RoomId, ServerMessage};
use tracing::debug;

/// A message addressed to one connection, produced by a registry decision
/// and handed to the transport for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipient: ConnectionId,
    pub message: ServerMessage,
}

impl Delivery {
    pub fn new(recipient: ConnectionId, message: ServerMessage) -> Self {
        Self { recipient, message }
    }
}

#[derive(Debug, Default)]
struct Room {
    members: Vec<ConnectionId>,
}

impl Room {
    fn contains(&self, id: &ConnectionId) -> bool {
        self.members.contains(id)
    }
}

/// Room id to members. Rooms exist only while they have at least one
/// member and never hold more than `capacity` connections.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    capacity: usize,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::with_capacity(ROOM_CAPACITY)
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            capacity,
        }
    }

    /// Adds `connection_id` to `room_id`.
    ///
    /// Rejoining a room the connection is already in is a no-op. The
    /// capacity check runs before the connection leaves any previous room,
    /// so a rejected join leaves the caller where it was. When the join
    /// fills the room, every other member receives `user-joined`.
    pub fn join(
        &mut self,
        connections: &mut ConnectionRegistry,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<Vec<Delivery>, RegistryError> {
        if !connections.is_live(connection_id) {
            return Err(RegistryError::UnknownConnection(connection_id.clone()));
        }

        let occupancy = match self.rooms.get(room_id) {
            Some(room) if room.contains(connection_id) => return Ok(Vec::new()),
            Some(room) => room.members.len(),
            None => 0,
        };
        if occupancy >= self.capacity {
            return Err(RegistryError::room_full(room_id));
        }

        if let Some(previous) = connections.room_of(connection_id) {
            self.remove_member(&previous, connection_id);
        }

        let room = self.rooms.entry(room_id.clone()).or_default();
        room.members.push(connection_id.clone());
        connections.set_room(connection_id, Some(room_id.clone()));
        debug!(
            connection = %connection_id,
            room = %room_id,
            members = room.members.len(),
            "Joined room"
        );

        if room.members.len() < self.capacity {
            return Ok(Vec::new());
        }

        let deliveries = room
            .members
            .iter()
            .filter(|member| *member != connection_id)
            .map(|member| {
                Delivery::new(
                    member.clone(),
                    ServerMessage::UserJoined {
                        id: connection_id.clone(),
                    },
                )
            })
            .collect();
        Ok(deliveries)
    }

    /// Removes the connection from its room. The remaining member is not
    /// notified. Returns the room that was left, if any.
    pub fn leave(
        &mut self,
        connections: &mut ConnectionRegistry,
        connection_id: &ConnectionId,
    ) -> Option<RoomId> {
        let room_id = connections.room_of(connection_id)?;
        self.remove_member(&room_id, connection_id);
        connections.set_room(connection_id, None);
        Some(room_id)
    }

    pub fn members(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|room| room.members.clone())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn remove_member(&mut self, room_id: &RoomId, connection_id: &ConnectionId) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        room.members.retain(|member| member != connection_id);
        if room.members.is_empty() {
            self.rooms.remove(room_id);
            debug!(room = %room_id, "Room emptied and removed");
        }
    }
}
