use crate::error::CallError;
use crate::media::TrackKind;
use crate::negotiation::{CallCommand, CallEvent, CallSnapshot, NegotiationState};
use tandem_core::{ConnectionId, RoomId};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable front end of a running negotiator.
#[derive(Clone)]
pub struct CallHandle {
    command_tx: mpsc::Sender<CallCommand>,
    state_rx: watch::Receiver<NegotiationState>,
}

impl CallHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<CallCommand>,
        state_rx: watch::Receiver<NegotiationState>,
    ) -> Self {
        Self {
            command_tx,
            state_rx,
        }
    }

    pub async fn join_room(&self, room_id: impl Into<RoomId>) -> Result<(), CallError> {
        self.send(CallCommand::JoinRoom(room_id.into())).await
    }

    /// Starts an outgoing call. Fails right away unless the negotiator is idle.
    pub async fn initiate_call(&self, target: ConnectionId) -> Result<(), CallError> {
        let (reply, rx) = oneshot::channel();
        self.send(CallCommand::InitiateCall { target, reply }).await?;
        rx.await.map_err(|_| CallError::ChannelClosed)?
    }

    pub async fn end_call(&self) -> Result<(), CallError> {
        self.send(CallCommand::EndCall).await
    }

    /// Ends the call and waits until the negotiator has torn the session
    /// down. Commands run in order, so the snapshot answer arrives after
    /// the end-call work is done.
    pub async fn hang_up(&self, wait: Duration) -> Result<NegotiationState, CallError> {
        self.end_call().await?;
        let snapshot = tokio::time::timeout(wait, self.snapshot())
            .await
            .map_err(|_| CallError::negotiation("timed out waiting for hang-up"))??;
        Ok(snapshot.state)
    }

    pub async fn set_track_enabled(&self, kind: TrackKind, enabled: bool) -> Result<(), CallError> {
        self.send(CallCommand::SetTrackEnabled { kind, enabled })
            .await
    }

    pub async fn snapshot(&self) -> Result<CallSnapshot, CallError> {
        let (reply, rx) = oneshot::channel();
        self.send(CallCommand::Inspect(reply)).await?;
        rx.await.map_err(|_| CallError::ChannelClosed)
    }

    pub fn state(&self) -> watch::Receiver<NegotiationState> {
        self.state_rx.clone()
    }

    async fn send(&self, cmd: CallCommand) -> Result<(), CallError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| CallError::ChannelClosed)
    }
}

/// Stream of [`CallEvent`]s from one negotiator.
pub struct CallEvents {
    rx: mpsc::UnboundedReceiver<CallEvent>,
}

impl CallEvents {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<CallEvent>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<CallEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<CallEvent> {
        self.rx.try_recv().ok()
    }
}
