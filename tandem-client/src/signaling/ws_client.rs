use crate::error::CallError;
use crate::signaling::SignalingChannel;
use futures::{SinkExt, StreamExt};
use tandem_core::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, warn};

/// WebSocket connection to the signaling server.
///
/// Outbound messages go through an unbounded queue drained by a writer
/// task; inbound frames are decoded by a reader task and handed to the
/// receiver returned from [`connect`](Self::connect).
pub struct WsSignalingClient {
    send_tx: mpsc::UnboundedSender<ClientMessage>,
    tasks: Vec<JoinHandle<()>>,
}

impl WsSignalingClient {
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerMessage>), tungstenite::Error> {
        let (ws_stream, _) = connect_async(url).await?;
        debug!(url = %url, "Signaling websocket connected");

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (send_tx, mut send_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<ServerMessage>();

        let writer = tokio::spawn(async move {
            while let Some(message) = send_rx.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode signaling message: {}", e);
                        continue;
                    }
                };
                if ws_write.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_write.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(message) => {
                                if inbound_tx.send(message).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Undecodable signaling frame: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Signaling websocket error: {}", e);
                        break;
                    }
                }
            }
            debug!("Signaling reader finished");
        });

        let client = Self {
            send_tx,
            tasks: vec![writer, reader],
        };
        Ok((client, inbound_rx))
    }

    pub fn is_closed(&self) -> bool {
        self.send_tx.is_closed()
    }
}

impl SignalingChannel for WsSignalingClient {
    fn send(&self, message: ClientMessage) -> Result<(), CallError> {
        self.send_tx
            .send(message)
            .map_err(|_| CallError::ChannelClosed)
    }
}

impl Drop for WsSignalingClient {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
