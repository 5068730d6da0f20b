use std::time::Duration;
use tandem_client::{NegotiationState, PeerSession, SessionId};
use tandem_core::ClientMessage;

use crate::integration::{create_test_call_with, init_tracing, peer};
use crate::utils::{
    EVENT_TIMEOUT_MS, MockMediaSource, MockSessionFactory, collect_states_until, eventually,
    next_sent, wait_for_snapshot, wait_for_state,
};

#[tokio::test]
async fn test_end_call_discards_pending_media_step() {
    init_tracing();
    let media = MockMediaSource::gated();
    let mut call = create_test_call_with(MockSessionFactory::new(), media.clone());

    call.handle.initiate_call(peer("bob")).await.unwrap();
    wait_for_snapshot(&call.handle, |s| s.state == NegotiationState::Offering)
        .await
        .unwrap();
    eventually("media requested", || media.requests() == 1)
        .await
        .unwrap();

    call.handle.end_call().await.unwrap();
    let states = collect_states_until(&mut call.events, NegotiationState::Idle)
        .await
        .unwrap();
    assert_eq!(
        states,
        vec![
            NegotiationState::Offering,
            NegotiationState::Closed,
            NegotiationState::Idle,
        ]
    );

    let snapshot = call.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.attempt, 1);
    assert_eq!(snapshot.session_id, Some(SessionId(2)));
    assert_eq!(snapshot.remote_id, None);
    assert!(call.factory.session(SessionId(1)).unwrap().is_closed());

    // The old acquisition completes after the reset and must be thrown away.
    media.release();
    eventually("stale media stopped", || {
        media.produced().first().is_some_and(|m| m.is_stopped())
    })
    .await
    .unwrap();

    let snapshot = call.handle.snapshot().await.unwrap();
    assert!(!snapshot.holds_local_media);
    assert_eq!(snapshot.state, NegotiationState::Idle);
    assert_eq!(call.signaling.offers_sent(), 0);
    assert_eq!(call.factory.session(SessionId(1)).unwrap().attached_tracks(), 0);

    // A fresh call runs on the new session.
    call.handle.initiate_call(peer("bob")).await.unwrap();
    eventually("second media request", || media.requests() == 2)
        .await
        .unwrap();
    media.release();

    match next_sent(&mut call.outbound).await.unwrap() {
        ClientMessage::CallUser { to, .. } => assert_eq!(to, peer("bob")),
        other => panic!("expected call-user, got {:?}", other),
    }
    wait_for_state(&call.handle, NegotiationState::AwaitingAnswer)
        .await
        .unwrap();

    let session = call.factory.latest().unwrap();
    assert_eq!(session.id(), SessionId(2));
    assert_eq!(session.attached_tracks(), 2);
    assert_eq!(call.signaling.offers_sent(), 1);
    assert!(!media.produced()[1].is_stopped());
}

#[tokio::test]
async fn test_end_call_while_idle_still_renews_session() {
    init_tracing();
    let mut call = crate::integration::create_test_call();

    call.handle.end_call().await.unwrap();
    let states = collect_states_until(&mut call.events, NegotiationState::Idle)
        .await
        .unwrap();
    assert_eq!(
        states,
        vec![NegotiationState::Closed, NegotiationState::Idle]
    );

    let snapshot = call.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.attempt, 1);
    assert_eq!(snapshot.session_id, Some(SessionId(2)));
    assert_eq!(call.factory.sessions().len(), 2);
}

#[tokio::test]
async fn test_hang_up_returns_after_teardown() {
    init_tracing();
    let mut call = crate::integration::create_test_call();

    call.handle.initiate_call(peer("bob")).await.unwrap();
    next_sent(&mut call.outbound).await.unwrap();
    wait_for_state(&call.handle, NegotiationState::AwaitingAnswer)
        .await
        .unwrap();

    let state = call
        .handle
        .hang_up(Duration::from_millis(EVENT_TIMEOUT_MS))
        .await
        .unwrap();
    assert_eq!(state, NegotiationState::Idle);

    // No waiting: the session and media are already released.
    assert!(call.factory.session(SessionId(1)).unwrap().is_closed());
    assert!(call.media.produced()[0].is_stopped());
}
