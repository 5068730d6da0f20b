use crate::config::RelayConfig;
use crate::error::RegistryError;
use crate::relay::RelayCommand;
use crate::room::{ConnectionRegistry, Delivery, RoomRegistry};
use serde_json::Value;
use tandem_core::{ClientMessage, ConnectionId, RelayKind, RoomId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Single writer over both registries. Every join, relay and detach is
/// processed here in arrival order, so membership checks never race.
pub struct RelayRouter {
    connections: ConnectionRegistry,
    rooms: RoomRegistry,
    command_rx: mpsc::Receiver<RelayCommand>,
    report_undeliverable: bool,
}

impl RelayRouter {
    pub fn new(command_rx: mpsc::Receiver<RelayCommand>, config: &RelayConfig) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            rooms: RoomRegistry::new(),
            command_rx,
            report_undeliverable: config.report_undeliverable,
        }
    }

    pub async fn run(mut self) {
        info!("Relay router started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd);
        }

        info!(
            connections = self.connections.len(),
            rooms = self.rooms.room_count(),
            "Command channel closed, relay router stopped"
        );
    }

    fn handle_command(&mut self, cmd: RelayCommand) {
        match cmd {
            RelayCommand::Attach {
                connection_id,
                outbox,
            } => {
                debug!(connection = %connection_id, "Connection attached");
                self.connections.attach(connection_id, outbox);
            }

            RelayCommand::Message {
                connection_id,
                message,
            } => self.handle_message(connection_id, message),

            RelayCommand::Detach { connection_id } => {
                let left = self.rooms.leave(&mut self.connections, &connection_id);
                self.connections.detach(&connection_id);
                debug!(connection = %connection_id, room = ?left, "Connection detached");
            }

            RelayCommand::RoomMembers { room_id, reply } => {
                let _ = reply.send(self.rooms.members(&room_id));
            }
        }
    }

    fn handle_message(&mut self, from: ConnectionId, message: ClientMessage) {
        if !self.connections.is_live(&from) {
            warn!(connection = %from, "Message from unattached connection ignored");
            return;
        }

        match message {
            ClientMessage::JoinRoom { room_id } => self.join(from, room_id),
            other => {
                if let Some((kind, to, payload)) = other.into_relay() {
                    self.relay(kind, from, to, payload);
                }
            }
        }
    }

    fn join(&mut self, from: ConnectionId, room_id: RoomId) {
        match self.rooms.join(&mut self.connections, &from, &room_id) {
            Ok(deliveries) => {
                info!(connection = %from, room = %room_id, "Joined room");
                self.deliver_all(deliveries);
            }
            Err(RegistryError::RoomFull { room_id }) => {
                info!(connection = %from, room = %room_id, "Room full, join rejected");
                self.deliver(Delivery::new(from, ServerMessage::RoomFull {}));
            }
            Err(e) => warn!(connection = %from, "Join failed: {}", e),
        }
    }

    fn relay(&mut self, kind: RelayKind, from: ConnectionId, to: ConnectionId, payload: Value) {
        if self.connections.is_live(&to) {
            debug!(%kind, from = %from, to = %to, "Relaying");
            self.deliver(Delivery::new(
                to,
                ServerMessage::relayed(kind, from, payload),
            ));
            return;
        }

        debug!(%kind, from = %from, to = %to, "Relay target not live, dropping");
        if self.report_undeliverable {
            self.deliver(Delivery::new(from, ServerMessage::PeerUnavailable { id: to }));
        }
    }

    fn deliver_all(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            self.deliver(delivery);
        }
    }

    fn deliver(&self, delivery: Delivery) {
        let Some(connection) = self.connections.get(&delivery.recipient) else {
            return;
        };
        if !connection.deliver(delivery.message) {
            debug!(connection = %delivery.recipient, "Outbox closed, delivery dropped");
        }
    }
}
