use crate::error::SessionError;
use crate::media::{LocalMedia, RemoteTrack, TrackKind};
use crate::session::{
    DescriptionState, LinkState, PeerSession, PeerSessionFactory, SessionEvent, SessionEventSink,
    SessionId,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tandem_core::{IceCandidate, IceServerConfig, SdpKind, SessionDescription};
use tokio::sync::Mutex;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

impl From<RTCPeerConnectionState> for LinkState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::Connecting => LinkState::Connecting,
            RTCPeerConnectionState::Connected => LinkState::Connected,
            RTCPeerConnectionState::Disconnected => LinkState::Disconnected,
            RTCPeerConnectionState::Failed => LinkState::Failed,
            RTCPeerConnectionState::Closed => LinkState::Closed,
            _ => LinkState::New,
        }
    }
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, SessionError> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
    };
    Ok(rtc)
}

fn codec_for(kind: TrackKind) -> RTCRtpCodecCapability {
    let mime_type = match kind {
        TrackKind::Audio => MIME_TYPE_OPUS,
        TrackKind::Video => MIME_TYPE_VP8,
    };
    RTCRtpCodecCapability {
        mime_type: mime_type.to_owned(),
        ..Default::default()
    }
}

/// Creates [`RtcPeerSession`]s against a fixed set of ICE servers.
#[derive(Debug, Clone)]
pub struct RtcSessionFactory {
    ice_servers: Vec<IceServerConfig>,
}

impl RtcSessionFactory {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = self
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect();

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PeerSessionFactory for RtcSessionFactory {
    async fn create(&self, sink: SessionEventSink) -> Result<Arc<dyn PeerSession>, SessionError> {
        let session = RtcPeerSession::new(self.rtc_configuration(), sink).await?;
        Ok(Arc::new(session))
    }
}

/// [`PeerSession`] backed by a webrtc-rs peer connection.
pub struct RtcPeerSession {
    id: SessionId,
    peer_connection: Arc<RTCPeerConnection>,
    local_tracks: Mutex<Vec<Arc<TrackLocalStaticSample>>>,
    closed: AtomicBool,
}

impl RtcPeerSession {
    pub async fn new(config: RTCConfiguration, sink: SessionEventSink) -> Result<Self, SessionError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let peer_connection = Arc::new(api.new_peer_connection(config).await?);
        let id = sink.session_id();

        let state_sink = sink.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let sink = state_sink.clone();
                Box::pin(async move {
                    info!(session = %sink.session_id(), state = ?s, "Peer connection state changed");
                    sink.emit(SessionEvent::ConnectionState(LinkState::from(s)));
                })
            },
        ));

        let ice_sink = sink.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let sink = ice_sink.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                sink.emit(SessionEvent::LocalCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let track_sink = sink;
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let sink = track_sink.clone();
            Box::pin(async move {
                let remote = RemoteTrack::from_rtc(track);
                debug!(session = %sink.session_id(), track = remote.id(), kind = %remote.kind(), "Remote track");
                sink.emit(SessionEvent::RemoteTrack(remote));
            })
        }));

        Ok(Self {
            id,
            peer_connection,
            local_tracks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl PeerSession for RtcPeerSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn attach_media(&self, media: &LocalMedia) -> Result<(), SessionError> {
        self.ensure_open()?;
        let mut local_tracks = self.local_tracks.lock().await;

        for track in media.tracks() {
            let rtc_track = Arc::new(TrackLocalStaticSample::new(
                codec_for(track.kind()),
                track.id().to_owned(),
                media.stream_id().to_owned(),
            ));
            self.peer_connection
                .add_track(Arc::clone(&rtc_track) as Arc<dyn TrackLocal + Send + Sync>)
                .await?;
            local_tracks.push(rtc_track);
        }
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, SessionError> {
        self.ensure_open()?;
        if self.peer_connection.local_description().await.is_some() {
            return Err(SessionError::LocalDescriptionCommitted);
        }

        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(
        &self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, SessionError> {
        self.ensure_open()?;
        if offer.kind != SdpKind::Offer {
            return Err(SessionError::Malformed("expected an offer".to_owned()));
        }
        if self.peer_connection.remote_description().await.is_some() {
            return Err(SessionError::RemoteDescriptionCommitted);
        }

        self.peer_connection
            .set_remote_description(to_rtc_description(offer)?)
            .await?;
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn apply_remote_description(&self, desc: SessionDescription) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.peer_connection.remote_description().await.is_some() {
            return Err(SessionError::RemoteDescriptionCommitted);
        }
        self.peer_connection
            .set_remote_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SessionError> {
        self.ensure_open()?;
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), SessionError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.local_tracks.lock().await.clear();
        self.peer_connection.close().await?;
        debug!(session = %self.id, "Peer session closed");
        Ok(())
    }

    async fn description_state(&self) -> DescriptionState {
        let local = self.peer_connection.local_description().await.is_some();
        let remote = self.peer_connection.remote_description().await.is_some();
        DescriptionState::from_flags(local, remote)
    }
}
