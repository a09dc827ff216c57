use crate::helpers::{start_test_gate_server, test_server_config};

use gate_core::Server;
use gate_core::error::GateError;
use gate_core::start_gate_server;

/// **VALUE**: A port already in use is reported as an IO error, not a panic.
///
/// **WHY THIS MATTERS**: The binary exits with a readable message when another
/// instance already holds the configured port.
#[tokio::test]
async fn given_port_in_use_when_starting_server_then_returns_io_error() {
    // GIVEN: A server already bound
    let gate = start_test_gate_server(1000).await;
    let mut config = test_server_config();
    config.port = gate.addr().port();

    // WHEN: A second server binds the same port
    let result = start_gate_server(&config, Server::new()).await;

    // THEN: Io error carrying a location
    match result {
        Err(error @ GateError::Io { .. }) => {
            assert!(error.to_string().contains("IO Error"));
            assert!(error.to_string().contains(".rs:"));
        }
        Err(other) => panic!("Expected Io error, got {other}"),
        Ok(_) => panic!("Second bind should fail"),
    }
}

#[tokio::test]
async fn given_unresolvable_bind_address_when_starting_server_then_returns_error() {
    let mut config = test_server_config();
    config.bind = String::from("not a host");

    let result = start_gate_server(&config, Server::new()).await;

    assert!(result.is_err());
}
