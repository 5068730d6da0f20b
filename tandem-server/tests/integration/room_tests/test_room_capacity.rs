use tandem_core::ServerMessage;

use crate::integration::{create_test_router, init_tracing};
use crate::utils::{RouterPeer, settle};

#[tokio::test]
async fn test_second_joiner_announced_to_first() {
    init_tracing();
    let service = create_test_router();

    let mut a = RouterPeer::attach(&service).await.unwrap();
    let mut b = RouterPeer::attach(&service).await.unwrap();

    a.join("lobby").await.unwrap();
    b.join("lobby").await.unwrap();

    let msg = a.expect_message().await.unwrap();
    assert_eq!(msg, ServerMessage::UserJoined { id: b.id.clone() });

    let members = settle(&service, "lobby").await.unwrap();
    assert_eq!(members, vec![a.id.clone(), b.id.clone()]);
    a.expect_nothing().unwrap();
    b.expect_nothing().unwrap();
}

#[tokio::test]
async fn test_third_joiner_gets_room_full_only() {
    init_tracing();
    let service = create_test_router();

    let mut a = RouterPeer::attach(&service).await.unwrap();
    let mut b = RouterPeer::attach(&service).await.unwrap();
    let mut c = RouterPeer::attach(&service).await.unwrap();

    a.join("lobby").await.unwrap();
    b.join("lobby").await.unwrap();
    c.join("lobby").await.unwrap();

    assert_eq!(c.expect_message().await.unwrap(), ServerMessage::RoomFull {});

    let members = settle(&service, "lobby").await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(!members.contains(&c.id));

    // Only the announcement of b ever reaches a.
    let to_a = a.drain();
    assert_eq!(to_a, vec![ServerMessage::UserJoined { id: b.id.clone() }]);
    b.expect_nothing().unwrap();
}

#[tokio::test]
async fn test_repeated_join_is_silent() {
    init_tracing();
    let service = create_test_router();

    let mut a = RouterPeer::attach(&service).await.unwrap();
    let mut b = RouterPeer::attach(&service).await.unwrap();

    a.join("lobby").await.unwrap();
    b.join("lobby").await.unwrap();
    a.expect_message().await.unwrap();

    b.join("lobby").await.unwrap();
    a.join("lobby").await.unwrap();

    let members = settle(&service, "lobby").await.unwrap();
    assert_eq!(members.len(), 2);
    a.expect_nothing().unwrap();
    b.expect_nothing().unwrap();
}
