use anyhow::{Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use tandem_core::{ClientMessage, RoomId, ServerMessage};
use tandem_server::{ServerConfig, SignalingService, app};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Starts the full HTTP app on an ephemeral port.
pub async fn spawn_server(config: ServerConfig) -> Result<SocketAddr> {
    let service = SignalingService::spawn(&config.relay);
    let router = app(service, &config.cors);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind test listener")?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(addr)
}

/// A WebSocket client speaking the JSON signaling protocol.
pub struct TestClient {
    writer: SplitSink<WsStream, Message>,
    reader: SplitStream<WsStream>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let url = format!("ws://{addr}/ws");
        let (stream, _) = connect_async(url.as_str())
            .await
            .context("Failed to connect test client")?;
        let (writer, reader) = stream.split();
        Ok(Self { writer, reader })
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.writer
            .send(Message::Text(json.into()))
            .await
            .context("Failed to send frame")
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.writer
            .send(Message::Text(text.to_owned().into()))
            .await
            .context("Failed to send frame")
    }

    pub async fn join(&mut self, room: &str) -> Result<()> {
        self.send(&ClientMessage::JoinRoom {
            room_id: RoomId::from(room),
        })
        .await
    }

    pub async fn recv(&mut self, timeout_ms: u64) -> Result<ServerMessage> {
        loop {
            let frame = tokio::time::timeout(Duration::from_millis(timeout_ms), self.reader.next())
                .await
                .context("Timeout waiting for frame")?
                .context("Socket closed")??;

            if let Message::Text(text) = frame {
                return serde_json::from_str(text.as_str()).context("Undecodable server frame");
            }
        }
    }

    /// Returns `true` when no text frame arrives within `window_ms`.
    pub async fn is_quiet(&mut self, window_ms: u64) -> bool {
        self.recv(window_ms).await.is_err()
    }

    pub async fn close(mut self) -> Result<()> {
        self.writer.close().await.context("Failed to close socket")
    }
}
