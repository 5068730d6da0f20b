use crate::media::MediaConstraints;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tandem_core::utils::DEFAULT_SIGNALING_PORT;
use tandem_core::{IceServerConfig, default_ice_servers};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub signaling_url: String,
    pub ice_servers: Vec<IceServerConfig>,
    pub media: MediaConstraints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_url: format!("ws://127.0.0.1:{DEFAULT_SIGNALING_PORT}/ws"),
            ice_servers: default_ice_servers(),
            media: MediaConstraints::default(),
        }
    }
}

impl ClientConfig {
    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("invalid configuration in '{}'", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("cannot read '{}'", path.display())),
        }
    }
}
