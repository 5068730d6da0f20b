use tandem_core::ServerMessage;

use crate::integration::{create_test_router, init_tracing};
use crate::utils::{RouterPeer, settle};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_never_exceed_capacity() {
    init_tracing();
    let service = create_test_router();

    let mut peers = Vec::new();
    for _ in 0..10 {
        peers.push(RouterPeer::attach(&service).await.unwrap());
    }

    let mut handles = Vec::new();
    for peer in peers {
        handles.push(tokio::spawn(async move {
            peer.join("contested").await.unwrap();
            peer
        }));
    }

    let mut peers = Vec::new();
    for handle in handles {
        peers.push(handle.await.unwrap());
    }

    let members = settle(&service, "contested").await.unwrap();
    assert_eq!(members.len(), 2);

    let mut rejected = 0;
    let mut announcements = 0;
    for peer in peers.iter_mut() {
        for msg in peer.drain() {
            match msg {
                ServerMessage::RoomFull {} => {
                    assert!(!members.contains(&peer.id));
                    rejected += 1;
                }
                ServerMessage::UserJoined { id } => {
                    assert!(members.contains(&id));
                    assert_ne!(id, peer.id);
                    announcements += 1;
                }
                other => panic!("unexpected delivery {:?}", other),
            }
        }
    }

    assert_eq!(rejected, 8);
    assert_eq!(announcements, 1);
}
