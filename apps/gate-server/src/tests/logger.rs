// Unit tests for logger module initialization logic

use crate::error::GateServerError;
use crate::logger::{
    DEFAULT_LOG_LEVEL, LOG_FILE_NAME, LOG_LEVEL_ENV, build_dispatch, initialize, level_from_env,
    parse_level,
};

use std::path::PathBuf;

use log::LevelFilter;
use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: Startup code and tests may both reach initialization.
/// A second call must not try to install a second global logger.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed,
/// causing fern to fail when setting a global logger twice.
#[test]
#[serial]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = TempDir::new().expect("temp dir");

    // WHEN: Calling initialize twice
    let result1 = initialize(temp_dir.path(), DEFAULT_LOG_LEVEL);
    let result2 = initialize(temp_dir.path(), DEFAULT_LOG_LEVEL);

    // THEN: Both return Ok and the log file exists
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(result2.is_ok(), "Second initialization should be a no-op");
    assert!(temp_dir.path().join(LOG_FILE_NAME).exists());
}

/// **VALUE**: Verifies that an unusable log directory is an error, not a panic.
///
/// **BUG THIS CATCHES**: Would catch if `fern::log_file()` is unwrapped.
#[test]
fn given_invalid_log_dir_when_building_dispatch_then_returns_logger_error() {
    // GIVEN: A path under a file, which can never be a directory
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    // WHEN: Building the dispatch
    let result = build_dispatch(&invalid_dir, DEFAULT_LOG_LEVEL);

    // THEN: Logger error naming the file
    match result {
        Err(GateServerError::Logger { message, .. }) => {
            assert!(message.contains(LOG_FILE_NAME));
        }
        Err(other) => panic!("Expected Logger error, got {other}"),
        Ok(_) => panic!("Should fail for an invalid log directory"),
    }
}

#[test]
fn given_level_names_when_parsing_then_case_and_padding_ignored() {
    assert_eq!(parse_level("warn").expect("warn"), LevelFilter::Warn);
    assert_eq!(parse_level(" TRACE ").expect("trace"), LevelFilter::Trace);
    assert_eq!(parse_level("off").expect("off"), LevelFilter::Off);
}

/// **BUG THIS CATCHES**: Would catch a typo in `$GATE_LOG_LEVEL` silently
/// falling back to the default instead of stopping startup.
#[test]
#[serial]
fn given_unknown_level_in_env_when_resolving_then_logger_error() {
    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::set_var(LOG_LEVEL_ENV, "verbose") };

    let result = level_from_env();

    unsafe { std::env::remove_var(LOG_LEVEL_ENV) };
    match result {
        Err(GateServerError::Logger { message, .. }) => assert!(message.contains("verbose")),
        other => panic!("Expected Logger error, got {other:?}"),
    }
}

#[test]
#[serial]
fn given_no_level_in_env_when_resolving_then_build_default() {
    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::remove_var(LOG_LEVEL_ENV) };

    assert_eq!(level_from_env().expect("default level"), DEFAULT_LOG_LEVEL);
}
