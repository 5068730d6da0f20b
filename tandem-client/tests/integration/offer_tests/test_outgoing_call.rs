use tandem_client::{CallError, NegotiationState};
use tandem_core::{ClientMessage, SdpKind, ServerMessage, SessionDescription};

use crate::integration::{
    answer_payload, candidate, candidate_payload, create_test_call, init_tracing, peer,
};
use crate::utils::{collect_states_until, eventually, next_sent, wait_for_snapshot, wait_for_state};

#[tokio::test]
async fn test_offer_is_sent_to_target() {
    init_tracing();
    let mut call = create_test_call();

    call.handle.initiate_call(peer("bob")).await.unwrap();

    match next_sent(&mut call.outbound).await.unwrap() {
        ClientMessage::CallUser { to, offer } => {
            assert_eq!(to, peer("bob"));
            let offer = SessionDescription::from_payload(&offer).unwrap();
            assert_eq!(offer.kind, SdpKind::Offer);
        }
        other => panic!("expected call-user, got {:?}", other),
    }

    wait_for_state(&call.handle, NegotiationState::AwaitingAnswer)
        .await
        .unwrap();

    let session = call.factory.latest().unwrap();
    assert_eq!(session.attached_tracks(), 2);
    assert_eq!(call.media.requests(), 1);
}

#[tokio::test]
async fn test_queued_candidates_flush_in_order_after_answer() {
    init_tracing();
    let mut call = create_test_call();

    call.handle.initiate_call(peer("bob")).await.unwrap();
    next_sent(&mut call.outbound).await.unwrap();
    wait_for_state(&call.handle, NegotiationState::AwaitingAnswer)
        .await
        .unwrap();

    for n in 1..=3 {
        call.deliver(ServerMessage::IceCandidate {
            from: peer("bob"),
            candidate: candidate_payload(n),
        });
    }
    wait_for_snapshot(&call.handle, |s| s.pending_candidates == 3)
        .await
        .unwrap();

    let session = call.factory.latest().unwrap();
    assert!(session.applied_candidates().is_empty());

    call.deliver(ServerMessage::AnswerMade {
        from: peer("bob"),
        answer: answer_payload("bob"),
    });
    wait_for_state(&call.handle, NegotiationState::Connected)
        .await
        .unwrap();

    assert_eq!(
        session.applied_candidates(),
        vec![candidate(1), candidate(2), candidate(3)]
    );
    assert_eq!(session.candidates_before_remote(), 0);
    assert_eq!(
        session.remote_description().map(|d| d.kind),
        Some(SdpKind::Answer)
    );

    // Queue is open now, later candidates go straight to the session.
    call.deliver(ServerMessage::IceCandidate {
        from: peer("bob"),
        candidate: candidate_payload(4),
    });
    eventually("fourth candidate applied", || {
        session.applied_candidates().len() == 4
    })
    .await
    .unwrap();
    assert_eq!(session.applied_candidates()[3], candidate(4));
    assert_eq!(session.candidates_before_remote(), 0);

    let states = collect_states_until(&mut call.events, NegotiationState::Connected)
        .await
        .unwrap();
    assert_eq!(
        states,
        vec![
            NegotiationState::Offering,
            NegotiationState::AwaitingAnswer,
            NegotiationState::Connected,
        ]
    );
}

#[tokio::test]
async fn test_answer_from_unrelated_peer_is_ignored() {
    init_tracing();
    let mut call = create_test_call();

    call.handle.initiate_call(peer("bob")).await.unwrap();
    next_sent(&mut call.outbound).await.unwrap();
    wait_for_state(&call.handle, NegotiationState::AwaitingAnswer)
        .await
        .unwrap();

    call.deliver(ServerMessage::AnswerMade {
        from: peer("mallory"),
        answer: answer_payload("mallory"),
    });
    // Inbound messages are handled in order, so once this one is queued the
    // answer above has been looked at.
    call.deliver(ServerMessage::IceCandidate {
        from: peer("bob"),
        candidate: candidate_payload(1),
    });
    let snapshot = wait_for_snapshot(&call.handle, |s| s.pending_candidates == 1)
        .await
        .unwrap();

    assert_eq!(snapshot.state, NegotiationState::AwaitingAnswer);
    assert_eq!(snapshot.remote_id, Some(peer("bob")));
    assert!(call.factory.latest().unwrap().remote_description().is_none());
}

#[tokio::test]
async fn test_initiate_call_requires_idle() {
    init_tracing();
    let mut call = create_test_call();

    call.handle.initiate_call(peer("bob")).await.unwrap();
    next_sent(&mut call.outbound).await.unwrap();
    wait_for_state(&call.handle, NegotiationState::AwaitingAnswer)
        .await
        .unwrap();

    let err = call.handle.initiate_call(peer("carol")).await.unwrap_err();
    assert_eq!(
        err,
        CallError::InvalidState {
            operation: "initiate a call",
            state: NegotiationState::AwaitingAnswer,
        }
    );

    let snapshot = call.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.remote_id, Some(peer("bob")));
    assert_eq!(call.signaling.offers_sent(), 1);
}
