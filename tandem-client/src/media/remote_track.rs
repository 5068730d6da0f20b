use crate::media::TrackKind;
use std::fmt;
use std::sync::Arc;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// A track received from the remote peer.
#[derive(Clone)]
pub struct RemoteTrack {
    id: String,
    stream_id: String,
    kind: TrackKind,
    rtp: Option<Arc<TrackRemote>>,
}

impl RemoteTrack {
    pub fn new(id: impl Into<String>, stream_id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            stream_id: stream_id.into(),
            kind,
            rtp: None,
        }
    }

    /// Wraps a webrtc-rs remote track. Unknown codec types are reported as video.
    pub fn from_rtc(track: Arc<TrackRemote>) -> Self {
        let kind = match track.kind() {
            RTPCodecType::Audio => TrackKind::Audio,
            _ => TrackKind::Video,
        };
        Self {
            id: track.id(),
            stream_id: track.stream_id(),
            kind,
            rtp: Some(track),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// The underlying RTP track for renderers that read packets.
    pub fn rtp(&self) -> Option<&Arc<TrackRemote>> {
        self.rtp.as_ref()
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .field("rtp", &self.rtp.is_some())
            .finish()
    }
}
