use crate::error::CallError;
use crate::media::{LocalMedia, LocalTrack, TrackKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which kinds of track to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl MediaConstraints {
    pub fn kinds(&self) -> Vec<TrackKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.audio {
            kinds.push(TrackKind::Audio);
        }
        if self.video {
            kinds.push(TrackKind::Video);
        }
        kinds
    }
}

#[derive(Debug, Clone, Error)]
pub enum MediaError {
    #[error("no track kinds requested")]
    NothingRequested,

    #[error("device unavailable: {0}")]
    Unavailable(String),
}

impl From<MediaError> for CallError {
    fn from(e: MediaError) -> Self {
        CallError::MediaUnavailable(e.to_string())
    }
}

/// Produces local media for a call. Device access lives behind this seam.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalMedia, MediaError>;
}

/// Hands out track handles without touching any device. Samples, if any,
/// are written by whoever owns the tracks.
#[derive(Debug, Clone, Default)]
pub struct SyntheticMediaSource;

#[async_trait]
impl MediaSource for SyntheticMediaSource {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalMedia, MediaError> {
        let kinds = constraints.kinds();
        if kinds.is_empty() {
            return Err(MediaError::NothingRequested);
        }

        let tracks = kinds.into_iter().map(LocalTrack::new).collect();
        Ok(LocalMedia::new(Uuid::new_v4().to_string(), tracks))
    }
}
