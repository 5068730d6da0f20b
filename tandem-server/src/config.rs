use crate::logging::LogFormat;
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tandem_core::utils::DEFAULT_SIGNALING_PORT;

/// Top-level server configuration, read from TOML. Every section is
/// optional; missing keys fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    pub cors: CorsConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_owned(),
            port: DEFAULT_SIGNALING_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_owned()],
        }
    }
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Capacity of the command channel feeding the relay router.
    pub command_buffer: usize,
    /// Answer relays to vanished targets with `peer-unavailable`.
    pub report_undeliverable: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            command_buffer: 256,
            report_undeliverable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Loads the configuration at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .with_context(|| format!("invalid configuration in '{}'", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "Configuration file not found, using defaults"
                );
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("cannot read '{}'", path.display())),
        }
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.relay.command_buffer == 0 {
            bail!("relay.command_buffer must be greater than zero");
        }
        if self.cors.allowed_origins.is_empty() {
            bail!("cors.allowed_origins must not be empty");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.network.bind, self.network.port)
    }
}
