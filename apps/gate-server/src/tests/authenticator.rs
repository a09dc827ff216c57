use crate::authenticator::{INVALID_TOKEN_MESSAGE, MISSING_TOKEN_MESSAGE, resolve_token};
use crate::tests::helpers::{Peer, TEST_TOKEN, gated_server};

use serde_json::json;
use serial_test::serial;

/// **VALUE**: Verifies the demo authenticator admits the configured token.
///
/// **BUG THIS CATCHES**: Would catch the authenticator resolving without
/// setting the authenticated flag, which the gate treats as a rejection.
#[tokio::test]
async fn given_configured_token_when_authenticating_then_admitted() {
    // GIVEN: A gated server and a client
    let server = gated_server(false).await;
    let mut peer = Peer::connect(&server).await;

    // WHEN: The client presents the configured token
    let (event, _) = peer.authenticate(&server, json!({ "token": TEST_TOKEN })).await;

    // THEN: Admitted
    assert_eq!(event, "authenticated");
    assert!(peer.socket.is_authenticated());
}

#[tokio::test]
async fn given_wrong_token_when_authenticating_then_invalid_token() {
    let server = gated_server(false).await;
    let mut peer = Peer::connect(&server).await;

    let (event, payload) = peer.authenticate(&server, json!({ "token": "nope" })).await;

    assert_eq!(event, "unauthorized");
    assert_eq!(payload["message"], INVALID_TOKEN_MESSAGE);
    assert!(peer.socket.is_closing());
}

#[tokio::test]
async fn given_payload_without_token_when_authenticating_then_missing_token() {
    let server = gated_server(false).await;
    let mut peer = Peer::connect(&server).await;

    let (event, payload) = peer.authenticate(&server, json!({ "user": "alice" })).await;

    assert_eq!(event, "unauthorized");
    assert_eq!(payload["message"], MISSING_TOKEN_MESSAGE);
}

/// **VALUE**: A prefix of the secret is not accepted.
#[tokio::test]
async fn given_token_prefix_when_authenticating_then_rejected() {
    let server = gated_server(false).await;
    let mut peer = Peer::connect(&server).await;

    let (event, _) = peer
        .authenticate(&server, json!({ "token": &TEST_TOKEN[..4] }))
        .await;

    assert_eq!(event, "unauthorized");
}

/// **VALUE**: The environment token wins over a generated one.
///
/// **WHY THIS MATTERS**: Operators pin the token through the environment (or
/// `.env`); silently generating a new one would lock every client out.
#[test]
#[serial]
fn given_token_in_env_when_resolving_then_env_value_used() {
    // GIVEN: The variable is set (with stray whitespace)
    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::set_var("GATE_TEST_TOKEN_SET", "  from-env  ") };

    // WHEN: Resolving
    let token = resolve_token("GATE_TEST_TOKEN_SET");

    // THEN: The trimmed env value is used
    assert!(token.matches("from-env"));
    unsafe { std::env::remove_var("GATE_TEST_TOKEN_SET") };
}

#[test]
#[serial]
fn given_no_token_in_env_when_resolving_then_uuid_generated() {
    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::remove_var("GATE_TEST_TOKEN_UNSET") };

    let first = resolve_token("GATE_TEST_TOKEN_UNSET");
    let second = resolve_token("GATE_TEST_TOKEN_UNSET");

    assert_eq!(first.len(), 36, "Generated token should be a hyphenated UUID");
    assert!(!first.matches(second.expose()), "Each generated token is fresh");
}

/// **BUG THIS CATCHES**: Would catch a blank variable becoming an empty shared
/// token that every client matches by sending `""`.
#[test]
#[serial]
fn given_blank_token_in_env_when_resolving_then_uuid_generated() {
    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::set_var("GATE_TEST_TOKEN_BLANK", "   ") };

    let token = resolve_token("GATE_TEST_TOKEN_BLANK");

    assert_eq!(token.len(), 36);
    assert!(!token.matches(""));
    unsafe { std::env::remove_var("GATE_TEST_TOKEN_BLANK") };
}
