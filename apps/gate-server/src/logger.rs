//! Logging for the gate server.
//!
//! Provides dual output (stdout with colors + file) with thread-safe initialization.
//! The level defaults per build profile and can be overridden with `$GATE_LOG_LEVEL`.

use crate::error::GateServerError;

use common::ErrorLocation;

use std::io::stdout;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

/// Thread-safe initialization guard.
static INIT_LOGGER_ONCE: Once = Once::new();

/// Tracks if logger initialization was already attempted.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "gate-server.log";

/// Overrides the log level (`error`, `warn`, `info`, `debug`, `trace`, `off`).
pub const LOG_LEVEL_ENV: &str = "GATE_LOG_LEVEL";

const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";
const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// `$GATE_LOG_LEVEL` when set, else [`DEFAULT_LOG_LEVEL`].
///
/// # Errors
///
/// Returns [`GateServerError::Logger`] if the variable names no level.
pub fn level_from_env() -> Result<LevelFilter, GateServerError> {
    match std::env::var(LOG_LEVEL_ENV) {
        Ok(raw) if !raw.trim().is_empty() => parse_level(&raw),
        _ => Ok(DEFAULT_LOG_LEVEL),
    }
}

#[track_caller]
pub(crate) fn parse_level(raw: &str) -> Result<LevelFilter, GateServerError> {
    raw.trim()
        .parse::<LevelFilter>()
        .map_err(|_| GateServerError::Logger {
            message: format!("Invalid log level {raw:?} in ${LOG_LEVEL_ENV}"),
            location: ErrorLocation::caller(),
        })
}

/// Initialize the logger with dual output (stdout + `{log_dir}/gate-server.log`).
///
/// Safe to call more than once: later calls log a warning and return `Ok`.
///
/// # Errors
///
/// Returns [`GateServerError::Logger`] if the log file cannot be created or a
/// global logger is already installed by someone else.
pub fn initialize(log_dir: &Path, level: LevelFilter) -> Result<(), GateServerError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = build_dispatch(log_dir, level).and_then(|dispatch| {
            dispatch.apply().map_err(|e| GateServerError::Logger {
                message: format!("Failed to initialize logger: {e}"),
                location: ErrorLocation::caller(),
            })
        });
        if result.is_ok() {
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{level:?}");
        }
    });

    result
}

/// Build the stdout + file dispatch without installing it.
#[track_caller]
pub(crate) fn build_dispatch(
    log_dir: &Path,
    level: LevelFilter,
) -> Result<Dispatch, GateServerError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = color_configuration.color(record.level()),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(stdout());

    // Plain text, no colors
    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level} - {target}] {message}",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                target = record.target(),
                message = message,
            ))
        })
        .chain(
            fern::log_file(&log_file_path).map_err(|e| GateServerError::Logger {
                message: format!("Failed to create log file {}: {e}", log_file_path.display()),
                location: ErrorLocation::caller(),
            })?,
        );

    Ok(Dispatch::new()
        .level(level)
        .level_for("tungstenite", level.min(LevelFilter::Info))
        .level_for("tokio_tungstenite", level.min(LevelFilter::Info))
        .chain(stdout_dispatch)
        .chain(file_dispatch))
}
