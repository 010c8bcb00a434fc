//! Peer lifecycle, status events, and run-loop tests.

use super::*;

use std::time::Duration;

use tokio::sync::oneshot;

use crate::transport::StatusEvent;

fn make_node_with_retry(id: &str, retry_secs: u64) -> Node {
    let mut config = Config::new();
    config.node.retry = Some(retry_secs);
    Node::with_id(PeerId::new(id), config)
}

// --- Connect / remove ---

#[test]
fn test_peer_connected_installs_routing_entry() {
    let mut node = make_node("a");
    let (handle, _rx) = peer_channel();
    node.peer_connected(PeerId::new("b"), handle);
    assert!(node.tbl().contains(&PeerId::new("b")));
    assert_eq!(node.peer_handles().len(), 1);
}

#[test]
fn test_unpeer_unknown_peer_is_a_nop() {
    let mut node = make_node("a");
    let mut status = node.take_status_rx().unwrap();
    node.handle_unpeer(&PeerId::new("ghost"));
    assert!(status.try_recv().is_err());
}

#[test]
fn test_unpeer_removes_state_and_emits_status() {
    let mut node = make_node("a");
    let mut status = node.take_status_rx().unwrap();
    let (handle, _rx) = peer_channel();
    node.peer_connected(PeerId::new("b"), handle);

    node.dispatch_event(Event::Unpeer(PeerId::new("b")));
    assert!(!node.tbl().contains(&PeerId::new("b")));
    assert_eq!(
        status.try_recv().unwrap(),
        StatusEvent::PeerRemoved {
            peer: PeerId::new("b")
        }
    );
}

// --- Disconnect / reconnect scheduling ---

#[test]
fn test_disconnect_emits_loss_and_schedules_reconnect() {
    let mut node = make_node_with_retry("a", 10);
    let mut status = node.take_status_rx().unwrap();
    let (handle, _rx) = peer_channel();
    node.peer_connected(PeerId::new("b"), handle);

    node.peer_disconnected(&PeerId::new("b"), Some("io error".into()));

    assert_eq!(
        status.try_recv().unwrap(),
        StatusEvent::PeerLost {
            peer: PeerId::new("b"),
            reason: Some("io error".into()),
        }
    );
    assert_eq!(
        status.try_recv().unwrap(),
        StatusEvent::ReconnectScheduled {
            peer: PeerId::new("b"),
            after: Duration::from_secs(10),
        }
    );
}

#[test]
fn test_zero_retry_disables_reconnect_scheduling() {
    let mut node = make_node_with_retry("a", 0);
    let mut status = node.take_status_rx().unwrap();
    let (handle, _rx) = peer_channel();
    node.peer_connected(PeerId::new("b"), handle);

    node.peer_disconnected(&PeerId::new("b"), None);

    assert!(matches!(
        status.try_recv().unwrap(),
        StatusEvent::PeerLost { .. }
    ));
    assert!(status.try_recv().is_err(), "no reconnect scheduled");
}

#[test]
fn test_shutdown_suppresses_reconnect_scheduling() {
    let mut node = make_node_with_retry("a", 10);
    let mut status = node.take_status_rx().unwrap();
    let (handle, _rx) = peer_channel();
    node.peer_connected(PeerId::new("b"), handle);

    node.shutdown();
    node.peer_disconnected(&PeerId::new("b"), Some("io error".into()));

    assert!(matches!(
        status.try_recv().unwrap(),
        StatusEvent::PeerLost { .. }
    ));
    assert!(status.try_recv().is_err(), "no reconnect during shutdown");
}

#[test]
fn test_disconnect_unknown_peer_is_a_nop() {
    let mut node = make_node("a");
    let mut status = node.take_status_rx().unwrap();
    node.peer_disconnected(&PeerId::new("ghost"), None);
    assert!(status.try_recv().is_err());
}

// --- Run loop ---

#[tokio::test]
async fn test_run_loop_answers_queries() {
    let mut node = make_node("alpha");
    let sender = node.sender();
    let task = tokio::spawn(async move { node.run().await });

    let (reply_tx, reply_rx) = oneshot::channel();
    sender.send(Event::GetId(reply_tx)).unwrap();
    assert_eq!(reply_rx.await.unwrap(), PeerId::new("alpha"));

    // Dropping the sender ends the loop.
    drop(sender);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_run_loop_terminates_after_drain() {
    let mut node = make_node("alpha");
    let sender = node.sender();
    let (handle, _rx) = peer_channel();
    sender
        .send(Event::PeerConnected {
            peer: PeerId::new("b"),
            handle,
        })
        .unwrap();
    sender.send(Event::Shutdown).unwrap();

    let task = tokio::spawn(async move { node.run().await });

    // The loop keeps draining while a peer path remains.
    let (reply_tx, reply_rx) = oneshot::channel();
    sender.send(Event::GetId(reply_tx)).unwrap();
    assert_eq!(reply_rx.await.unwrap(), PeerId::new("alpha"));

    // The last disconnect completes the shutdown.
    sender
        .send(Event::PeerDisconnected {
            peer: PeerId::new("b"),
            reason: None,
        })
        .unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_with_no_peers_terminates_immediately() {
    let mut node = make_node("alpha");
    let sender = node.sender();
    sender.send(Event::Shutdown).unwrap();
    let task = tokio::spawn(async move { node.run().await });
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_get_direct_subscriptions_via_events() {
    let mut node = make_node("a");
    let (handle, _rx) = peer_channel();
    node.peer_connected(PeerId::new("b"), handle);
    node.handle_filter_update(
        vec![PeerId::new("b")],
        Filter::from_topics(["from/b"]),
        1,
    );

    let sender = node.sender();
    let task = tokio::spawn(async move { node.run().await });

    let (reply_tx, reply_rx) = oneshot::channel();
    sender.send(Event::GetDirectSubscriptions(reply_tx)).unwrap();
    let subs = reply_rx.await.unwrap();
    assert!(subs.matches(&crate::topic::Topic::new("from/b")));

    drop(sender);
    task.await.unwrap().unwrap();
}
