//! # Logging Utilities
//!
//! Logging infrastructure for pdbenum using `tracing`.
//!
//! - Console output goes to **stderr**; stdout carries only results so JSON and
//!   XML output stay machine-readable
//! - Pretty (default) or JSON event format
//! - Level filtering through `RUST_LOG` or an explicit level
//! - Optional daily-rolled log file
//! - Quiet mode (see [`crate::quiet`]) checked on every console event
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdbenum_utils::init_logging;
//!
//! // Keep the guard alive until exit so the log file is flushed
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Finding module...");
//! tracing::error!("Something failed");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Level filter (e.g. `RUST_LOG=debug`, `RUST_LOG=pdbenum_core=trace`)
//! - `PDBENUM_LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
//! - `PDBENUM_LOG_FILE`: Optional log file path; the file sees every event,
//!   quiet mode or not

use std::ffi::OsStr;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fmt as std_fmt};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::quiet;

/// Environment variable selecting the log format
pub const LOG_FORMAT_ENV: &str = "PDBENUM_LOG_FORMAT";

/// Environment variable naming a log file
pub const LOG_FILE_ENV: &str = "PDBENUM_LOG_FILE";

const DEFAULT_LOG_FILE_NAME: &str = "pdbenum.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat
{
    /// Format named by `PDBENUM_LOG_FORMAT`, or `Pretty`
    pub fn from_env() -> Self
    {
        env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|s| LogFormat::from_str(&s).ok())
            .unwrap_or_default()
    }
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

impl std_fmt::Display for LogLevel
{
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result
    {
        let label = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(label)
    }
}

/// Keeps the background log-file writer alive
///
/// Dropping it flushes and stops file logging. Console logging is unaffected.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LoggingGuard
{
    file: Option<WorkerGuard>,
}

impl LoggingGuard
{
    /// Whether a log file is being written
    pub fn has_file(&self) -> bool
    {
        self.file.is_some()
    }
}

/// Initialize logging from the environment
///
/// Reads:
/// - `RUST_LOG`: Level filter (default `info`)
/// - `PDBENUM_LOG_FORMAT`: Output format (`json` or `pretty`, default `pretty`)
/// - `PDBENUM_LOG_FILE`: Optional path to a log file
///
/// ## Errors
///
/// - `InitializationFailed`: a global subscriber is already installed
/// - `FileError`: the log file's directory could not be created
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(None, LogFormat::from_env(), log_file_from_env())
}

/// Initialize logging with an explicit level, which takes precedence over `RUST_LOG`
///
/// `PDBENUM_LOG_FILE` is still honoured.
///
/// ```rust,no_run
/// use pdbenum_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// - `InitializationFailed`: a global subscriber is already installed
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(Some(level.into()), format, log_file_from_env())
}

fn log_file_from_env() -> Option<PathBuf>
{
    env::var_os(LOG_FILE_ENV).filter(|path| !path.is_empty()).map(PathBuf::from)
}

/// Level filter: explicit level, else `RUST_LOG`, else `info`
fn level_filter(explicit_level: Option<Level>) -> EnvFilter
{
    match explicit_level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
    }
}

fn init_logging_internal(explicit_level: Option<Level>, format: LogFormat, log_file: Option<PathBuf>)
    -> Result<LoggingGuard, LoggingError>
{
    let mut layers = vec![console_layer(format, explicit_level)];

    let file_guard = match log_file {
        Some(path) => {
            let (layer, guard) = file_layer(&path, format, explicit_level)?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { file: file_guard })
}

fn console_layer(format: LogFormat, explicit_level: Option<Level>) -> BoxedLayer
{
    let quiet_filter = filter_fn(|metadata| quiet::allows(metadata.level()));

    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(io::stderr().is_terminal())
            .with_writer(io::stderr)
            .with_filter(level_filter(explicit_level))
            .with_filter(quiet_filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .with_filter(level_filter(explicit_level))
            .with_filter(quiet_filter)
            .boxed(),
    }
}

fn file_layer(path: &Path, format: LogFormat, explicit_level: Option<Level>)
    -> Result<(BoxedLayer, WorkerGuard), LoggingError>
{
    let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(directory)?;
    let file_name = path.file_name().unwrap_or(OsStr::new(DEFAULT_LOG_FILE_NAME));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, file_name));

    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .with_filter(level_filter(explicit_level))
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(level_filter(explicit_level))
            .boxed(),
    };
    Ok((layer, guard))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
