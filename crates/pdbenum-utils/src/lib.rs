//! # pdbenum Utilities
//!
//! Shared logging setup and the process-wide quiet switch for pdbenum.
//!
//! Everything in the workspace logs through `tracing`; this crate decides
//! where those events go (stderr, optionally a log file) and which of them are
//! shown.

pub mod logging;
pub mod quiet;

// Re-export commonly used logging functions for convenience
pub use logging::{LogFormat, LogLevel, LoggingError, LoggingGuard, init_logging, init_logging_with_level};
pub use quiet::{is_quiet, set_quiet};
pub use tracing::{debug, error, info, trace, warn};
