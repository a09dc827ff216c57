use crate::tests::helpers::{Peer, gated_server};

use serde_json::json;

/// **VALUE**: Verifies authenticated traffic reaches the other members.
///
/// **WHY THIS MATTERS**: The relay is what makes the demo server useful. It
/// must deliver to peers and must not echo to the sender.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The relay broadcasts to the whole namespace including the sender
/// - The relay forwards the `authentication` event itself
#[tokio::test]
async fn given_two_authenticated_peers_when_one_sends_then_other_receives() {
    // GIVEN: Two admitted peers
    let server = gated_server(true).await;
    let mut alice = Peer::connect(&server).await;
    let mut bob = Peer::connect(&server).await;
    alice.login(&server).await;
    bob.login(&server).await;

    // WHEN: Alice sends a chat event
    alice.send(&server, "chat", json!({ "text": "hi" })).await;

    // THEN: Bob gets it, Alice does not
    let (event, payload) = bob.next_event().await;
    assert_eq!(event, "chat");
    assert_eq!(payload, json!({ "text": "hi" }));
    assert!(alice.is_quiet().await);
}

/// **VALUE**: An unauthenticated socket cannot push traffic to members.
#[tokio::test]
async fn given_unauthenticated_sender_when_sending_then_not_relayed() {
    // GIVEN: One admitted listener and one pending sender
    let server = gated_server(true).await;
    let mut listener = Peer::connect(&server).await;
    listener.login(&server).await;
    let intruder = Peer::connect(&server).await;

    // WHEN: The pending socket sends
    intruder.send(&server, "chat", json!({ "text": "spam" })).await;

    // THEN: Nothing is relayed
    assert!(listener.is_quiet().await);
}

#[tokio::test]
async fn given_pending_peer_when_member_sends_then_pending_peer_excluded() {
    let server = gated_server(true).await;
    let mut alice = Peer::connect(&server).await;
    alice.login(&server).await;
    let mut pending = Peer::connect(&server).await;

    alice.send(&server, "chat", json!("hello")).await;

    assert!(pending.is_quiet().await);
}
