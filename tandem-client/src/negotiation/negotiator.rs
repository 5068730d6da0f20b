use crate::error::{CallError, SessionError};
use crate::media::{LocalMedia, MediaConstraints, MediaError, MediaSource, RemoteTrack};
use crate::negotiation::{
    Admission, CallCommand, CallEvent, CallEvents, CallHandle, CallSnapshot, NegotiationState,
    PendingCandidateQueue,
};
use crate::session::{
    LinkState, PeerSession, PeerSessionFactory, SessionEvent, SessionEventSink, SessionId,
};
use crate::signaling::SignalingChannel;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tandem_core::{
    ClientMessage, ConnectionId, IceCandidate, RoomId, SdpKind, ServerMessage, SessionDescription,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 64;

/// Result of an async step, tagged with the attempt it was started for.
struct StepOutcome {
    attempt: u64,
    result: StepResult,
}

enum StepResult {
    MediaReady {
        media: Result<LocalMedia, MediaError>,
        next: NextStep,
    },
    OfferCreated(Result<SessionDescription, SessionError>),
    AnswerCreated(Result<SessionDescription, SessionError>),
    RemoteApplied(Result<(), SessionError>),
}

/// What to do once local media is in hand.
enum NextStep {
    Offer,
    Answer(SessionDescription),
}

/// Collaborators a negotiator drives.
pub struct NegotiatorParts {
    pub factory: Arc<dyn PeerSessionFactory>,
    pub media_source: Arc<dyn MediaSource>,
    pub signaling: Arc<dyn SignalingChannel>,
    pub inbound: mpsc::UnboundedReceiver<ServerMessage>,
    pub constraints: MediaConstraints,
}

/// Per-client call state machine.
///
/// Runs as a single task. UI commands, relayed server messages, session
/// callbacks and completed async steps are all funnelled through one
/// `select!` loop, so state is only ever touched from here.
pub struct Negotiator {
    factory: Arc<dyn PeerSessionFactory>,
    media_source: Arc<dyn MediaSource>,
    signaling: Arc<dyn SignalingChannel>,
    constraints: MediaConstraints,

    state: NegotiationState,
    attempt: u64,
    next_session_id: u64,
    session: Option<Arc<dyn PeerSession>>,
    queue: PendingCandidateQueue,
    remote_id: Option<ConnectionId>,
    known_peer: Option<ConnectionId>,
    room: Option<RoomId>,
    local_media: Option<LocalMedia>,
    remote_tracks: Vec<RemoteTrack>,
    remote_media_seen: bool,
    applying_remote: bool,
    inbound_open: bool,
    /// Set once our offer or answer is on the wire. Local candidates wait
    /// in `local_backlog` until then.
    description_sent: bool,
    local_backlog: Vec<IceCandidate>,

    command_rx: mpsc::Receiver<CallCommand>,
    inbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
    session_tx: mpsc::UnboundedSender<(SessionId, SessionEvent)>,
    session_rx: mpsc::UnboundedReceiver<(SessionId, SessionEvent)>,
    step_tx: mpsc::UnboundedSender<StepOutcome>,
    step_rx: mpsc::UnboundedReceiver<StepOutcome>,
    events_tx: mpsc::UnboundedSender<CallEvent>,
    state_tx: watch::Sender<NegotiationState>,
}

impl Negotiator {
    /// Starts a negotiator on the current runtime.
    pub fn spawn(parts: NegotiatorParts) -> (CallHandle, CallEvents) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(NegotiationState::Idle);
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let (step_tx, step_rx) = mpsc::unbounded_channel();

        let negotiator = Self {
            factory: parts.factory,
            media_source: parts.media_source,
            signaling: parts.signaling,
            constraints: parts.constraints,
            state: NegotiationState::Idle,
            attempt: 0,
            next_session_id: 0,
            session: None,
            queue: PendingCandidateQueue::new(),
            remote_id: None,
            known_peer: None,
            room: None,
            local_media: None,
            remote_tracks: Vec::new(),
            remote_media_seen: false,
            applying_remote: false,
            inbound_open: true,
            description_sent: false,
            local_backlog: Vec::new(),
            command_rx,
            inbound_rx: parts.inbound,
            session_tx,
            session_rx,
            step_tx,
            step_rx,
            events_tx,
            state_tx,
        };
        tokio::spawn(negotiator.run());

        (
            CallHandle::new(command_tx, state_rx),
            CallEvents::new(events_rx),
        )
    }

    async fn run(mut self) {
        info!("Negotiator started");
        self.session = self.create_session().await;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Call handle dropped. Shutting down negotiator.");
                            break;
                        }
                    }
                }

                msg = self.inbound_rx.recv(), if self.inbound_open => {
                    match msg {
                        Some(m) => self.handle_server_message(m).await,
                        None => {
                            warn!("Signaling channel closed");
                            self.inbound_open = false;
                            self.emit(CallEvent::Error(CallError::ChannelClosed));
                        }
                    }
                }

                Some((session_id, event)) = self.session_rx.recv() => {
                    self.handle_session_event(session_id, event).await;
                }

                Some(outcome) = self.step_rx.recv() => {
                    self.handle_step(outcome).await;
                }
            }
        }

        self.teardown().await;
        info!("Negotiator finished");
    }

    async fn handle_command(&mut self, cmd: CallCommand) {
        match cmd {
            CallCommand::JoinRoom(room_id) => {
                info!(room = %room_id, "Joining room");
                self.room = Some(room_id.clone());
                if let Err(e) = self.signaling.send(ClientMessage::JoinRoom { room_id }) {
                    self.emit(CallEvent::Error(e));
                }
            }

            CallCommand::InitiateCall { target, reply } => {
                let result = self.initiate_call(target).await;
                let _ = reply.send(result);
            }

            CallCommand::EndCall => self.end_call("local hang-up").await,

            CallCommand::SetTrackEnabled { kind, enabled } => match &self.local_media {
                Some(media) => {
                    if !media.set_enabled(kind, enabled) {
                        debug!(%kind, "No local track of that kind");
                    }
                }
                None => debug!(%kind, "No local media to toggle"),
            },

            CallCommand::Inspect(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn initiate_call(&mut self, target: ConnectionId) -> Result<(), CallError> {
        if self.state != NegotiationState::Idle {
            return Err(CallError::invalid_state("initiate a call", self.state));
        }
        if self.ensure_session().await.is_none() {
            return Err(CallError::negotiation("no peer session available"));
        }

        let stale = self.queue.clear();
        if stale > 0 {
            debug!(count = stale, "Dropping candidates received before our offer");
        }

        info!(attempt = self.attempt, target = %target, "Initiating call");
        self.remote_id = Some(target);
        self.set_state(NegotiationState::Offering);
        self.with_local_media(NextStep::Offer).await;
        Ok(())
    }

    async fn handle_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::RoomFull {} => match self.room.clone() {
                Some(room) => {
                    warn!(room = %room, "Room is full");
                    self.emit(CallEvent::RoomFull(room));
                }
                None => warn!("room-full received without a pending join"),
            },

            ServerMessage::UserJoined { id } => {
                info!(peer = %id, "Peer joined the room");
                self.known_peer = Some(id.clone());
                self.emit(CallEvent::PeerJoined(id));
            }

            ServerMessage::CallMade { from, offer } => self.on_incoming_call(from, offer).await,

            ServerMessage::AnswerMade { from, answer } => self.on_answer(from, answer).await,

            ServerMessage::IceCandidate { from, candidate } => {
                self.on_remote_candidate(from, candidate).await
            }

            ServerMessage::PeerUnavailable { id } => self.on_peer_unavailable(id).await,
        }
    }

    async fn on_incoming_call(&mut self, from: ConnectionId, offer: Value) {
        // The caller may trickle candidates ahead of its offer. Keep those,
        // drop anything queued from other senders.
        let early = self.queue.take_from(&from);
        if self.state != NegotiationState::Idle {
            info!(state = %self.state, peer = %from, "Incoming call supersedes current attempt");
            self.end_call("superseded by incoming call").await;
        } else {
            self.queue.clear();
        }
        if self.ensure_session().await.is_none() {
            return;
        }
        if !early.is_empty() {
            debug!(count = early.len(), peer = %from, "Keeping candidates sent ahead of the offer");
        }
        for candidate in early {
            self.queue.admit(from.clone(), candidate);
        }

        info!(attempt = self.attempt, peer = %from, "Incoming call");
        self.remote_id = Some(from);
        self.set_state(NegotiationState::Answering);

        let offer = match parse_description(&offer, SdpKind::Offer) {
            Ok(desc) => desc,
            Err(e) => {
                self.fail_attempt(e).await;
                return;
            }
        };
        self.with_local_media(NextStep::Answer(offer)).await;
    }

    async fn on_answer(&mut self, from: ConnectionId, answer: Value) {
        if self.state != NegotiationState::AwaitingAnswer || self.applying_remote {
            debug!(state = %self.state, peer = %from, "Ignoring unexpected answer");
            return;
        }
        if self.remote_id.as_ref() != Some(&from) {
            warn!(peer = %from, "Answer from a peer we did not call");
            return;
        }

        let answer = match parse_description(&answer, SdpKind::Answer) {
            Ok(desc) => desc,
            Err(e) => {
                self.fail_attempt(e).await;
                return;
            }
        };
        let Some(session) = self.session.clone() else {
            self.fail_attempt(CallError::negotiation("no peer session"))
                .await;
            return;
        };

        self.applying_remote = true;
        self.spawn_step(async move {
            StepResult::RemoteApplied(session.apply_remote_description(answer).await)
        });
    }

    async fn on_remote_candidate(&mut self, from: ConnectionId, candidate: Value) {
        if let Some(remote) = &self.remote_id {
            if remote != &from {
                debug!(peer = %from, "Ignoring candidate from unrelated peer");
                return;
            }
        }

        let candidate = match IceCandidate::from_payload(&candidate) {
            Ok(c) => c,
            Err(e) => {
                warn!(peer = %from, "Dropping malformed ICE candidate: {}", e);
                return;
            }
        };

        match self.queue.admit(from, candidate) {
            Admission::ApplyNow(c) => self.apply_candidate(c).await,
            Admission::Queued { depth } => debug!(depth, "Remote candidate queued"),
        }
    }

    async fn on_peer_unavailable(&mut self, id: ConnectionId) {
        if self.known_peer.as_ref() == Some(&id) {
            self.known_peer = None;
        }
        if self.remote_id.as_ref() == Some(&id) && self.state.is_negotiating() {
            warn!(peer = %id, "Remote peer vanished during negotiation");
            self.emit(CallEvent::Error(CallError::RelayDropped(id)));
            self.end_call("peer unavailable").await;
        } else {
            debug!(peer = %id, "peer-unavailable for a peer we are not negotiating with");
        }
    }

    async fn handle_session_event(&mut self, session_id: SessionId, event: SessionEvent) {
        if self.session.as_ref().map(|s| s.id()) != Some(session_id) {
            debug!(session = %session_id, "Event from released session ignored");
            return;
        }

        match event {
            SessionEvent::LocalCandidate(candidate) => {
                let Some(to) = self.remote_id.clone() else {
                    debug!("Remote peer unknown, dropping local candidate");
                    return;
                };
                if self.description_sent {
                    self.send_local_candidate(to, candidate);
                } else {
                    self.local_backlog.push(candidate);
                }
            }

            SessionEvent::RemoteTrack(track) => {
                info!(track = track.id(), kind = %track.kind(), "Remote track arrived");
                self.remote_tracks.push(track.clone());
                self.emit(CallEvent::RemoteTrack(track));
                self.on_remote_media();
            }

            SessionEvent::ConnectionState(link) => {
                self.emit(CallEvent::ConnectionStateChanged(link));
                if link == LinkState::Connected {
                    self.on_remote_media();
                }
            }
        }
    }

    /// The answering side is connected once remote media shows up and its
    /// own answer is committed, in whichever order those happen.
    fn on_remote_media(&mut self) {
        if self.state != NegotiationState::Answering {
            return;
        }
        if self.queue.is_open() {
            self.set_state(NegotiationState::Connected);
        } else {
            self.remote_media_seen = true;
        }
    }

    async fn handle_step(&mut self, outcome: StepOutcome) {
        if outcome.attempt != self.attempt {
            debug!(
                step_attempt = outcome.attempt,
                attempt = self.attempt,
                "Discarding result of superseded attempt"
            );
            if let StepResult::MediaReady { media: Ok(media), .. } = outcome.result {
                media.stop_all();
            }
            return;
        }

        match outcome.result {
            StepResult::MediaReady {
                media: Ok(media),
                next,
            } => {
                self.local_media = Some(media.clone());
                self.run_step(next, media).await;
            }

            StepResult::MediaReady { media: Err(e), .. } => {
                warn!("Local media unavailable: {}", e);
                self.emit(CallEvent::Error(e.into()));
                self.teardown().await;
                self.reset().await;
            }

            StepResult::OfferCreated(Ok(offer)) => {
                let Some(to) = self.remote_id.clone() else {
                    return;
                };
                let sent = offer
                    .to_payload()
                    .map_err(|e| CallError::negotiation(e.to_string()))
                    .and_then(|offer| self.signaling.send(ClientMessage::CallUser { to, offer }));
                match sent {
                    Ok(()) => {
                        self.on_description_sent();
                        self.set_state(NegotiationState::AwaitingAnswer);
                    }
                    Err(e) => self.fail_attempt(e).await,
                }
            }

            StepResult::AnswerCreated(Ok(answer)) => {
                let Some(to) = self.remote_id.clone() else {
                    return;
                };
                let sent = answer
                    .to_payload()
                    .map_err(|e| CallError::negotiation(e.to_string()))
                    .and_then(|answer| {
                        self.signaling
                            .send(ClientMessage::MakeAnswer { to, answer })
                    });
                if let Err(e) = sent {
                    self.fail_attempt(e).await;
                    return;
                }

                self.on_description_sent();
                self.flush_pending().await;
                if self.remote_media_seen {
                    self.set_state(NegotiationState::Connected);
                }
            }

            StepResult::RemoteApplied(Ok(())) => {
                self.applying_remote = false;
                self.flush_pending().await;
                self.set_state(NegotiationState::Connected);
            }

            StepResult::OfferCreated(Err(e))
            | StepResult::AnswerCreated(Err(e))
            | StepResult::RemoteApplied(Err(e)) => self.fail_attempt(e.into()).await,
        }
    }

    async fn with_local_media(&mut self, next: NextStep) {
        if let Some(media) = self.local_media.clone() {
            self.run_step(next, media).await;
            return;
        }

        let source = Arc::clone(&self.media_source);
        let constraints = self.constraints;
        self.spawn_step(async move {
            StepResult::MediaReady {
                media: source.acquire(&constraints).await,
                next,
            }
        });
    }

    async fn run_step(&mut self, next: NextStep, media: LocalMedia) {
        let Some(session) = self.session.clone() else {
            self.fail_attempt(CallError::negotiation("no peer session"))
                .await;
            return;
        };

        match next {
            NextStep::Offer => self.spawn_step(async move {
                StepResult::OfferCreated(offer_with_media(session, media).await)
            }),
            NextStep::Answer(offer) => self.spawn_step(async move {
                StepResult::AnswerCreated(answer_with_media(session, media, offer).await)
            }),
        }
    }

    fn spawn_step<F>(&self, step: F)
    where
        F: Future<Output = StepResult> + Send + 'static,
    {
        let attempt = self.attempt;
        let tx = self.step_tx.clone();
        tokio::spawn(async move {
            let result = step.await;
            let _ = tx.send(StepOutcome { attempt, result });
        });
    }

    /// Releases local candidates held back until our description went out.
    fn on_description_sent(&mut self) {
        self.description_sent = true;
        let Some(to) = self.remote_id.clone() else {
            self.local_backlog.clear();
            return;
        };
        for candidate in std::mem::take(&mut self.local_backlog) {
            self.send_local_candidate(to.clone(), candidate);
        }
    }

    fn send_local_candidate(&self, to: ConnectionId, candidate: IceCandidate) {
        let payload = match candidate.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Cannot encode local candidate: {}", e);
                return;
            }
        };
        if let Err(e) = self.signaling.send(ClientMessage::IceCandidate {
            to,
            candidate: payload,
        }) {
            warn!("Failed to send local candidate: {}", e);
        }
    }

    async fn flush_pending(&mut self) {
        let backlog = self.queue.open();
        if !backlog.is_empty() {
            debug!(count = backlog.len(), "Flushing queued candidates");
        }
        for candidate in backlog {
            self.apply_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&self, candidate: IceCandidate) {
        let Some(session) = &self.session else {
            return;
        };
        if let Err(e) = session.add_ice_candidate(candidate).await {
            warn!(session = %session.id(), "Failed to add ICE candidate: {}", e);
        }
    }

    async fn fail_attempt(&mut self, e: CallError) {
        error!(attempt = self.attempt, "Negotiation failed: {}", e);
        self.emit(CallEvent::Error(e));
        self.end_call("negotiation failed").await;
    }

    async fn end_call(&mut self, reason: &str) {
        info!(attempt = self.attempt, reason, "Ending call");
        self.teardown().await;
        self.set_state(NegotiationState::Closed);
        self.reset().await;
    }

    /// Stops local media and releases the current session.
    async fn teardown(&mut self) {
        if let Some(media) = self.local_media.take() {
            media.stop_all();
        }
        self.remote_tracks.clear();
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!(session = %session.id(), "Error while closing session: {}", e);
            }
        }
    }

    /// Starts a fresh attempt: new session, empty queue, no remote peer.
    async fn reset(&mut self) {
        self.attempt += 1;
        self.queue = PendingCandidateQueue::new();
        self.remote_id = None;
        self.remote_media_seen = false;
        self.applying_remote = false;
        self.description_sent = false;
        self.local_backlog.clear();
        self.session = self.create_session().await;
        self.set_state(NegotiationState::Idle);
    }

    async fn ensure_session(&mut self) -> Option<Arc<dyn PeerSession>> {
        if self.session.is_none() {
            self.session = self.create_session().await;
        }
        self.session.clone()
    }

    async fn create_session(&mut self) -> Option<Arc<dyn PeerSession>> {
        self.next_session_id += 1;
        let id = SessionId(self.next_session_id);
        let sink = SessionEventSink::new(id, self.session_tx.clone());

        match self.factory.create(sink).await {
            Ok(session) => {
                debug!(session = %id, attempt = self.attempt, "Peer session created");
                Some(session)
            }
            Err(e) => {
                error!(session = %id, "Failed to create peer session: {}", e);
                self.emit(CallEvent::Error(e.into()));
                None
            }
        }
    }

    fn set_state(&mut self, state: NegotiationState) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "State transition");
        self.state = state;
        self.state_tx.send_replace(state);
        self.emit(CallEvent::StateChanged(state));
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.events_tx.send(event);
    }

    fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            state: self.state,
            attempt: self.attempt,
            session_id: self.session.as_ref().map(|s| s.id()),
            pending_candidates: self.queue.len(),
            remote_id: self.remote_id.clone(),
            known_peer: self.known_peer.clone(),
            room: self.room.clone(),
            holds_local_media: self.local_media.is_some(),
            remote_tracks: self.remote_tracks.len(),
        }
    }
}

async fn offer_with_media(
    session: Arc<dyn PeerSession>,
    media: LocalMedia,
) -> Result<SessionDescription, SessionError> {
    session.attach_media(&media).await?;
    session.create_offer().await
}

async fn answer_with_media(
    session: Arc<dyn PeerSession>,
    media: LocalMedia,
    offer: SessionDescription,
) -> Result<SessionDescription, SessionError> {
    session.attach_media(&media).await?;
    session.create_answer(offer).await
}

fn parse_description(payload: &Value, expected: SdpKind) -> Result<SessionDescription, CallError> {
    let desc = SessionDescription::from_payload(payload)
        .map_err(|e| CallError::negotiation(format!("malformed session description: {e}")))?;
    if desc.kind != expected {
        return Err(CallError::negotiation(format!(
            "expected {:?} description, got {:?}",
            expected, desc.kind
        )));
    }
    Ok(desc)
}
