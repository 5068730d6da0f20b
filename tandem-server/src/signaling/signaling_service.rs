use crate::config::RelayConfig;
use crate::error::SignalingError;
use crate::relay::{RelayCommand, RelayRouter};
use tandem_core::{ClientMessage, ConnectionId, RoomId, ServerMessage};
use tokio::sync::{mpsc, oneshot};

/// Cloneable handle the transport uses to talk to the relay router.
#[derive(Clone)]
pub struct SignalingService {
    router_tx: mpsc::Sender<RelayCommand>,
}

impl SignalingService {
    pub fn new(router_tx: mpsc::Sender<RelayCommand>) -> Self {
        Self { router_tx }
    }

    /// Starts a relay router on the current runtime and returns its handle.
    pub fn spawn(config: &RelayConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let router = RelayRouter::new(rx, config);
        tokio::spawn(router.run());
        Self::new(tx)
    }

    pub async fn attach(
        &self,
        connection_id: ConnectionId,
        outbox: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<(), SignalingError> {
        self.send(RelayCommand::Attach {
            connection_id,
            outbox,
        })
        .await
    }

    pub async fn dispatch(
        &self,
        connection_id: ConnectionId,
        message: ClientMessage,
    ) -> Result<(), SignalingError> {
        self.send(RelayCommand::Message {
            connection_id,
            message,
        })
        .await
    }

    pub async fn detach(&self, connection_id: ConnectionId) -> Result<(), SignalingError> {
        self.send(RelayCommand::Detach { connection_id }).await
    }

    pub async fn room_members(&self, room_id: RoomId) -> Result<Vec<ConnectionId>, SignalingError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::RoomMembers { room_id, reply })
            .await?;
        rx.await.map_err(|_| SignalingError::RouterClosed)
    }

    async fn send(&self, cmd: RelayCommand) -> Result<(), SignalingError> {
        self.router_tx
            .send(cmd)
            .await
            .map_err(|_| SignalingError::RouterClosed)
    }
}
