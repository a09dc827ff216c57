use crate::{CONFIG_DIR_ENV, config_dir, start};

use common::RedactedToken;

use gate_core::config::GateConfig;

use std::path::PathBuf;

use serial_test::serial;

/// **VALUE**: Verifies startup creates every configured namespace and binds.
///
/// **WHY THIS MATTERS**: Namespaces listed in gate.toml must exist before the
/// first client joins, so broadcasts to them work from the start.
#[tokio::test]
async fn given_config_with_namespaces_when_starting_then_all_exist_and_bound() {
    // GIVEN: An ephemeral port and an extra namespace
    let mut config = GateConfig::default();
    config.server.port = 0;
    config.server.namespaces = vec![String::from("/"), String::from("/chat")];

    // WHEN: Starting
    let running = start(&config, RedactedToken::new("token"))
        .await
        .expect("start should succeed");

    // THEN: Both namespaces exist and a real port was bound
    assert!(running.server.namespace("/chat").await.is_some());
    assert_eq!(running.server.namespaces().await.len(), 2);
    assert_ne!(running.handle.local_addr().port(), 0);
    running.handle.shutdown();
}

#[test]
#[serial]
fn given_config_dir_env_when_resolving_then_env_path_used() {
    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::set_var(CONFIG_DIR_ENV, "/tmp/gate-config-test") };

    let dir = config_dir().expect("config dir");

    assert_eq!(dir, PathBuf::from("/tmp/gate-config-test"));
    unsafe { std::env::remove_var(CONFIG_DIR_ENV) };
}

#[test]
#[serial]
fn given_no_env_override_when_resolving_then_platform_dir_used() {
    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::remove_var(CONFIG_DIR_ENV) };

    if let Ok(dir) = config_dir() {
        assert!(dir.ends_with("socket-gate"));
    }
}
