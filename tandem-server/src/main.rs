use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tandem_server::logging::{LogFormat, init_logging};
use tandem_server::{ServerConfig, SignalingService, app};
use tracing::info;

/// Signaling relay for two-party WebRTC calls.
#[derive(Debug, Parser)]
#[command(name = "tandem-server", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "TANDEM_CONFIG", default_value = "tandem.toml")]
    config: PathBuf,

    /// Interface to bind.
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Log level or filter directive.
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(bind) = self.bind {
            config.network.bind = bind;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(&cli.config)?;
    cli.apply(&mut config);
    config.validate()?;

    init_logging(&config.logging.level, config.logging.format);

    let service = SignalingService::spawn(&config.relay);
    let router = app(service, &config.cors);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!("Signaling server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Signaling server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
