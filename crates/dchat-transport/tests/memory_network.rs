//! Integration tests for the in-memory pub/sub network.
//!
//! These drive several nodes on one `MemoryNetwork` through the public
//! `Transport` / `TransportChannel` traits, the same way the room layer
//! does.

#[cfg(feature = "memory")]
mod memory {
    use std::time::Duration;

    use dchat_transport::{
        ChannelEvent, MemoryChannel, MemoryNetwork, PeerId, Transport,
        TransportChannel, TransportError,
    };

    /// Receives the next event or fails the test after a short wait.
    async fn next(channel: &MemoryChannel) -> ChannelEvent {
        tokio::time::timeout(Duration::from_secs(1), channel.recv())
            .await
            .expect("event should arrive")
            .expect("recv should not fail")
            .expect("channel should be open")
    }

    #[tokio::test]
    async fn test_peer_joined_is_seen_in_both_directions() {
        let network = MemoryNetwork::new();
        let x = network.node_with_id("x").subscribe("General").await.unwrap();
        assert_eq!(next(&x).await, ChannelEvent::Subscribed);

        let y = network.node_with_id("y").subscribe("General").await.unwrap();

        assert_eq!(next(&x).await, ChannelEvent::PeerJoined(PeerId::from("y")));
        assert_eq!(next(&y).await, ChannelEvent::Subscribed);
        assert_eq!(next(&y).await, ChannelEvent::PeerJoined(PeerId::from("x")));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_including_sender() {
        let network = MemoryNetwork::new();
        let a = network.node_with_id("a").subscribe("General").await.unwrap();
        let b = network.node_with_id("b").subscribe("General").await.unwrap();

        // Drain presence events.
        assert_eq!(next(&a).await, ChannelEvent::Subscribed);
        assert_eq!(next(&a).await, ChannelEvent::PeerJoined(PeerId::from("b")));
        assert_eq!(next(&b).await, ChannelEvent::Subscribed);
        assert_eq!(next(&b).await, ChannelEvent::PeerJoined(PeerId::from("a")));

        a.broadcast(b"hello").await.unwrap();

        let expected = ChannelEvent::Message {
            sender: PeerId::from("a"),
            data: b"hello".to_vec(),
        };
        assert_eq!(next(&a).await, expected);
        assert_eq!(next(&b).await, expected);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let network = MemoryNetwork::new();
        let general = network.node_with_id("a").subscribe("General").await.unwrap();
        let fun = network.node_with_id("b").subscribe("Fun").await.unwrap();

        assert_eq!(next(&general).await, ChannelEvent::Subscribed);
        assert_eq!(next(&fun).await, ChannelEvent::Subscribed);

        general.broadcast(b"only general").await.unwrap();
        assert!(matches!(next(&general).await, ChannelEvent::Message { .. }));

        let nothing =
            tokio::time::timeout(Duration::from_millis(20), fun.recv()).await;
        assert!(nothing.is_err(), "Fun should not see General traffic");
        assert!(general.peers().is_empty());
    }

    #[tokio::test]
    async fn test_leave_notifies_remaining_and_closes_stream() {
        let network = MemoryNetwork::new();
        let a = network.node_with_id("a").subscribe("General").await.unwrap();
        let b = network.node_with_id("b").subscribe("General").await.unwrap();
        assert_eq!(a.peers(), vec![PeerId::from("b")]);

        b.leave().await.unwrap();

        assert_eq!(next(&a).await, ChannelEvent::Subscribed);
        assert_eq!(next(&a).await, ChannelEvent::PeerJoined(PeerId::from("b")));
        assert_eq!(next(&a).await, ChannelEvent::PeerLeft(PeerId::from("b")));
        assert!(a.peers().is_empty());

        // b's queued events drain, then the stream ends.
        assert_eq!(next(&b).await, ChannelEvent::Subscribed);
        assert_eq!(next(&b).await, ChannelEvent::PeerJoined(PeerId::from("a")));
        assert_eq!(b.recv().await.unwrap(), None);

        let after_leave = b.broadcast(b"late").await;
        assert!(matches!(after_leave, Err(TransportError::Closed(_))));
    }

    #[tokio::test]
    async fn test_resubscribe_is_seen_as_leave_then_join() {
        let network = MemoryNetwork::new();
        let node = network.node_with_id("x");
        let y = network.node_with_id("y").subscribe("General").await.unwrap();
        let old = node.subscribe("General").await.unwrap();
        assert_eq!(next(&y).await, ChannelEvent::Subscribed);
        assert_eq!(next(&y).await, ChannelEvent::PeerJoined(PeerId::from("x")));

        // The old channel has not left yet when x comes back.
        let new = node.subscribe("General").await.unwrap();

        assert_eq!(next(&y).await, ChannelEvent::PeerLeft(PeerId::from("x")));
        assert_eq!(next(&y).await, ChannelEvent::PeerJoined(PeerId::from("x")));
        assert_eq!(next(&new).await, ChannelEvent::Subscribed);
        assert_eq!(next(&new).await, ChannelEvent::PeerJoined(PeerId::from("y")));

        // Its late leave touches nothing.
        old.leave().await.unwrap();
        assert_eq!(
            network.subscribers("General"),
            vec![PeerId::from("x"), PeerId::from("y")]
        );
        assert_eq!(new.peers(), vec![PeerId::from("y")]);
    }

    #[tokio::test]
    async fn test_leave_twice_is_harmless() {
        let network = MemoryNetwork::new();
        let a = network.node_with_id("a").subscribe("General").await.unwrap();
        a.leave().await.unwrap();
        a.leave().await.unwrap();
        assert!(network.subscribers("General").is_empty());
    }

    #[tokio::test]
    async fn test_held_subscription_never_becomes_ready() {
        let network = MemoryNetwork::new();
        network.hold_subscriptions(true);
        let a = network.node_with_id("a").subscribe("General").await.unwrap();

        let waited =
            tokio::time::timeout(Duration::from_millis(20), a.recv()).await;
        assert!(waited.is_err(), "held subscription should stay silent");
        assert!(network.subscribers("General").is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_after_shutdown_fails() {
        let network = MemoryNetwork::new();
        network.shutdown();
        let result = network.node().subscribe("General").await;
        assert!(matches!(result, Err(TransportError::SubscribeFailed(_))));
    }

    #[tokio::test]
    async fn test_generated_nodes_have_distinct_ids() {
        let network = MemoryNetwork::new();
        assert_ne!(
            network.node().local_peer_id(),
            network.node().local_peer_id()
        );
    }
}
