//! End-to-end tests: spawned clients on one in-memory network, driven only
//! through their handles.

use std::time::Duration;

use dchat::prelude::*;
use dchat_protocol::{Codec, JsonCodec};
use dchat_transport::ChannelEvent;

// =========================================================================
// Helpers
// =========================================================================

fn spawn_client(network: &MemoryNetwork, id: &str, config: RoomConfig) -> ClientHandle {
    DchatClientBuilder::new()
        .identity(Identity::new(id, format!("{id}-color")))
        .config(config)
        .build(network.node_with_id(id))
        .spawn()
}

/// Polls the client's snapshot until `condition` holds.
async fn wait_for(
    handle: &ClientHandle,
    condition: impl Fn(&RoomSnapshot) -> bool,
) -> RoomSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = handle.snapshot().await.unwrap();
            if condition(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never reached")
}

fn member_count(n: usize) -> impl Fn(&RoomSnapshot) -> bool {
    move |s| s.state == SessionState::Active && s.members.len() == n
}

fn chat_texts(snapshot: &RoomSnapshot) -> Vec<&str> {
    snapshot.chat.iter().map(ChatEntry::text).collect()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_client_joins_default_room_on_start() {
    let network = MemoryNetwork::new();
    let x = spawn_client(&network, "x", RoomConfig::default());

    let snapshot = wait_for(&x, member_count(1)).await;

    assert_eq!(snapshot.room_name.as_deref(), Some("General"));
    assert_eq!(snapshot.local_peer_id, PeerId::from("x"));
    assert_eq!(snapshot.members[0].1, Identity::new("x", "x-color"));
    x.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_two_clients_chat() {
    let network = MemoryNetwork::new();
    let x = spawn_client(&network, "x", RoomConfig::default());
    let y = spawn_client(&network, "y", RoomConfig::default());

    wait_for(&x, member_count(2)).await;
    wait_for(&y, member_count(2)).await;

    x.submit_message("hello").await.unwrap();
    y.submit_message("hi x").await.unwrap();

    let x_view = wait_for(&x, |s| s.chat.len() == 2).await;
    let y_view = wait_for(&y, |s| s.chat.len() == 2).await;
    assert_eq!(chat_texts(&x_view), chat_texts(&y_view));
    assert!(chat_texts(&x_view).contains(&"hello"));
    assert!(chat_texts(&x_view).contains(&"hi x"));
}

#[tokio::test]
async fn test_submit_alone_is_rejected() {
    let network = MemoryNetwork::new();
    let x = spawn_client(&network, "x", RoomConfig::default());
    wait_for(&x, member_count(1)).await;

    let err = x.submit_message("anyone?").await.unwrap_err();

    assert!(matches!(
        err.as_room_error(),
        Some(RoomError::SendPrecondition { members: 1 })
    ));
}

#[tokio::test]
async fn test_room_switch_isolates_rooms() {
    let network = MemoryNetwork::new();
    let x = spawn_client(&network, "x", RoomConfig::default());
    let y = spawn_client(&network, "y", RoomConfig::default());
    wait_for(&x, member_count(2)).await;
    wait_for(&y, member_count(2)).await;

    x.select_room("Fun").await.unwrap();

    let x_view = wait_for(&x, member_count(1)).await;
    assert_eq!(x_view.room_name.as_deref(), Some("Fun"));
    assert!(x_view.chat.is_empty());
    wait_for(&y, member_count(1)).await;

    y.select_room("Fun").await.unwrap();
    wait_for(&x, member_count(2)).await;
    wait_for(&y, member_count(2)).await;
}

#[tokio::test]
async fn test_peer_shutdown_removes_member() {
    let network = MemoryNetwork::new();
    let a = spawn_client(&network, "a", RoomConfig::default());
    let b = spawn_client(&network, "b", RoomConfig::default());
    let c = spawn_client(&network, "c", RoomConfig::default());
    for client in [&a, &b, &c] {
        wait_for(client, member_count(3)).await;
    }

    c.shutdown().await.unwrap();

    let a_view = wait_for(&a, member_count(2)).await;
    let ids: Vec<&str> = a_view.members.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    wait_for(&b, member_count(2)).await;
}

#[tokio::test]
async fn test_handle_after_shutdown_is_closed() {
    let network = MemoryNetwork::new();
    let x = spawn_client(&network, "x", RoomConfig::default());
    let other = x.clone();

    x.shutdown().await.unwrap();

    assert!(matches!(other.snapshot().await, Err(DchatError::ClientClosed)));
    assert!(matches!(other.shutdown().await, Err(DchatError::ClientClosed)));
    assert!(other.is_closed());
}

#[tokio::test]
async fn test_peers_lists_transport_view() {
    let network = MemoryNetwork::new();
    let x = spawn_client(&network, "x", RoomConfig::default());
    let y = spawn_client(&network, "y", RoomConfig::default());
    wait_for(&x, member_count(2)).await;

    assert_eq!(x.peers().await.unwrap(), vec![PeerId::from("y")]);
    y.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_subscribe_failure_reports_unavailable() {
    let network = MemoryNetwork::new();
    network.shutdown();
    let x = spawn_client(&network, "x", RoomConfig::default());

    let snapshot = wait_for(&x, |s| s.state == SessionState::Unavailable).await;
    assert_eq!(snapshot.room_name.as_deref(), Some("General"));

    let err = x.select_room("Fun").await.unwrap_err();
    assert!(matches!(
        err.as_room_error(),
        Some(RoomError::TransportUnavailable { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_subscription_times_out() {
    let network = MemoryNetwork::new();
    network.hold_subscriptions(true);
    let config = RoomConfig {
        subscribe_timeout: Duration::from_secs(10),
        ..RoomConfig::default()
    };
    let x = spawn_client(&network, "x", config);

    let joining = x.snapshot().await.unwrap();
    assert_eq!(joining.state, SessionState::Joining);

    // Paused time auto-advances while the actor sleeps on the deadline.
    tokio::time::sleep(Duration::from_secs(11)).await;

    let snapshot = x.snapshot().await.unwrap();
    assert_eq!(snapshot.state, SessionState::Unavailable);
    assert!(snapshot.members.is_empty());
}

#[tokio::test]
async fn test_reannounce_rebroadcasts_confirm_join() {
    let network = MemoryNetwork::new();
    let observer = network
        .node_with_id("observer")
        .subscribe("General")
        .await
        .unwrap();
    let config = RoomConfig {
        reannounce_interval: Some(Duration::from_millis(20)),
        ..RoomConfig::default()
    };
    let _x = spawn_client(&network, "x", config);

    // The observer never sends a Join, so any ConfirmJoin from x comes from
    // the re-announce timer.
    let confirmed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match observer.recv().await.unwrap() {
                Some(ChannelEvent::Message { sender, data }) => {
                    let action = JsonCodec.decode_action(&data).unwrap();
                    if let Action::ConfirmJoin { id, identity } = action {
                        return (sender, id, identity);
                    }
                }
                Some(_) => {}
                None => panic!("observer channel closed"),
            }
        }
    })
    .await
    .expect("no re-announce seen");

    assert_eq!(confirmed.0, PeerId::from("x"));
    assert_eq!(confirmed.1, PeerId::from("x"));
    assert_eq!(confirmed.2, Identity::new("x", "x-color"));
}
