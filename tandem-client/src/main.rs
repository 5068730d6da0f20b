use anyhow::{Context, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tandem_client::{
    CallError, CallEvent, ClientConfig, Negotiator, NegotiatorParts, NegotiationState,
    RtcSessionFactory, SyntheticMediaSource, WsSignalingClient,
};
use tandem_core::{ConnectionId, RoomId};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const SHUTDOWN_WAIT: Duration = Duration::from_secs(2);

/// Joins a room on a tandem signaling server and negotiates a call.
#[derive(Debug, Parser)]
#[command(name = "tandem-call", version, about)]
struct Cli {
    /// Room to join.
    room: String,

    #[arg(long, env = "TANDEM_CLIENT_CONFIG", default_value = "tandem-client.toml")]
    config: PathBuf,

    /// Signaling WebSocket URL, overrides the configuration file.
    #[arg(long)]
    url: Option<String>,

    /// Call the peer as soon as it joins the room.
    #[arg(long)]
    auto_call: bool,

    /// Call this connection id right after joining.
    #[arg(long)]
    call: Option<String>,

    #[arg(long)]
    no_video: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load(&cli.config)?;
    if let Some(url) = cli.url {
        config.signaling_url = url;
    }
    if cli.no_video {
        config.media.video = false;
    }

    let (signaling, inbound) = WsSignalingClient::connect(&config.signaling_url)
        .await
        .with_context(|| format!("cannot reach {}", config.signaling_url))?;
    info!("Connected to {}", config.signaling_url);

    let (handle, mut events) = Negotiator::spawn(NegotiatorParts {
        factory: Arc::new(RtcSessionFactory::new(config.ice_servers.clone())),
        media_source: Arc::new(SyntheticMediaSource),
        signaling: Arc::new(signaling),
        inbound,
        constraints: config.media,
    });

    handle.join_room(RoomId::new(cli.room)).await?;
    if let Some(target) = cli.call {
        handle.initiate_call(ConnectionId::from(target)).await?;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    CallEvent::StateChanged(state) => info!("Call state: {}", state),
                    CallEvent::PeerJoined(peer) => {
                        info!("Peer {} joined", peer);
                        if cli.auto_call && *handle.state().borrow() == NegotiationState::Idle {
                            if let Err(e) = handle.initiate_call(peer).await {
                                warn!("Cannot call: {}", e);
                            }
                        }
                    }
                    CallEvent::RoomFull(room) => bail!(CallError::RoomFull(room)),
                    CallEvent::RemoteTrack(track) => {
                        info!("Receiving {} track {}", track.kind(), track.id())
                    }
                    CallEvent::ConnectionStateChanged(link) => info!("Link: {:?}", link),
                    CallEvent::Error(CallError::ChannelClosed) => {
                        error!("Signaling connection lost");
                        break;
                    }
                    CallEvent::Error(e) => warn!("{}", e),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Hanging up");
                match handle.hang_up(SHUTDOWN_WAIT).await {
                    Ok(state) => info!("Call ended, negotiator {}", state),
                    Err(e) => warn!("Hang-up incomplete: {}", e),
                }
                break;
            }
        }
    }

    // Dropping the last handle stops the negotiator, which closes its
    // session before the event stream ends.
    drop(handle);
    let drained = tokio::time::timeout(SHUTDOWN_WAIT, async {
        while events.recv().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!("Negotiator did not stop in time");
    }

    Ok(())
}
