use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tandem_client::{
    CallEvent, CallEvents, CallHandle, MediaConstraints, NegotiationState, Negotiator,
    NegotiatorParts, WsSignalingClient,
};
use tandem_core::{ConnectionId, RoomId};
use tandem_server::{ServerConfig, SignalingService, app};

use crate::integration::{candidate, init_tracing};
use crate::utils::{
    EVENT_TIMEOUT_MS, MockMediaSource, MockSessionFactory, POLL_INTERVAL_MS, eventually,
    wait_for_event, wait_for_snapshot, wait_for_state,
};

struct Caller {
    handle: CallHandle,
    events: CallEvents,
    factory: MockSessionFactory,
}

async fn spawn_server() -> Result<(SocketAddr, SignalingService)> {
    let config = ServerConfig::default();
    let service = SignalingService::spawn(&config.relay);
    let router = app(service.clone(), &config.cors);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind test listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((addr, service))
}

async fn connect_caller(addr: SocketAddr, media: MockMediaSource) -> Result<Caller> {
    let (client, inbound) = WsSignalingClient::connect(&format!("ws://{addr}/ws"))
        .await
        .context("Failed to connect signaling client")?;
    let factory = MockSessionFactory::new();

    let (handle, events) = Negotiator::spawn(NegotiatorParts {
        factory: Arc::new(factory.clone()),
        media_source: Arc::new(media),
        signaling: Arc::new(client),
        inbound,
        constraints: MediaConstraints::default(),
    });

    Ok(Caller {
        handle,
        events,
        factory,
    })
}

async fn wait_for_members(service: &SignalingService, room: &str, count: usize) -> Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(EVENT_TIMEOUT_MS);
    loop {
        let members = service.room_members(RoomId::from(room)).await?;
        if members.len() == count {
            return Ok(());
        }
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("Room {room} has {} members, wanted {count}", members.len());
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

#[tokio::test]
async fn test_two_clients_connect_through_server() {
    init_tracing();
    let (addr, service) = spawn_server().await.unwrap();

    let mut alice = connect_caller(addr, MockMediaSource::new()).await.unwrap();
    let bob_media = MockMediaSource::gated();
    let mut bob = connect_caller(addr, bob_media.clone()).await.unwrap();

    alice.handle.join_room("e2e").await.unwrap();
    wait_for_members(&service, "e2e", 1).await.unwrap();
    bob.handle.join_room("e2e").await.unwrap();

    let bob_id: ConnectionId = match wait_for_event(&mut alice.events, |e| {
        matches!(e, CallEvent::PeerJoined(_))
    })
    .await
    .unwrap()
    {
        CallEvent::PeerJoined(id) => id,
        other => panic!("expected peer-joined, got {:?}", other),
    };

    alice.handle.initiate_call(bob_id.clone()).await.unwrap();
    wait_for_state(&alice.handle, NegotiationState::AwaitingAnswer)
        .await
        .unwrap();

    // Bob is still waiting on his camera, so these must queue on his side.
    let alice_session = alice.factory.latest().unwrap();
    for n in 1..=3 {
        alice_session.emit_local_candidate(candidate(n));
    }
    let snapshot = wait_for_snapshot(&bob.handle, |s| s.pending_candidates == 3)
        .await
        .unwrap();
    assert_eq!(snapshot.state, NegotiationState::Answering);

    bob_media.release();

    wait_for_state(&alice.handle, NegotiationState::Connected)
        .await
        .unwrap();

    let bob_session = bob.factory.latest().unwrap();
    eventually("bob applied queued candidates", || {
        bob_session.applied_candidates().len() == 3
    })
    .await
    .unwrap();
    assert_eq!(
        bob_session.applied_candidates(),
        vec![candidate(1), candidate(2), candidate(3)]
    );
    assert_eq!(bob_session.candidates_before_remote(), 0);

    bob_session.emit_remote_track(tandem_client::TrackKind::Video);
    wait_for_state(&bob.handle, NegotiationState::Connected)
        .await
        .unwrap();

    assert!(alice_session.remote_description().is_some());
}

#[tokio::test]
async fn test_third_client_gets_room_full() {
    init_tracing();
    let (addr, service) = spawn_server().await.unwrap();

    let first = connect_caller(addr, MockMediaSource::new()).await.unwrap();
    let second = connect_caller(addr, MockMediaSource::new()).await.unwrap();
    let mut third = connect_caller(addr, MockMediaSource::new()).await.unwrap();

    first.handle.join_room("pair").await.unwrap();
    second.handle.join_room("pair").await.unwrap();
    wait_for_members(&service, "pair", 2).await.unwrap();

    third.handle.join_room("pair").await.unwrap();
    let event = wait_for_event(&mut third.events, |e| matches!(e, CallEvent::RoomFull(_)))
        .await
        .unwrap();
    assert!(matches!(event, CallEvent::RoomFull(room) if room == RoomId::from("pair")));

    wait_for_members(&service, "pair", 2).await.unwrap();
}
