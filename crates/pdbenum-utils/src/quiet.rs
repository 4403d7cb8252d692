//! # Quiet Mode
//!
//! One process-wide switch that silences diagnostic output.
//!
//! When quiet mode is on, the console log layer installed by
//! [`init_logging`](crate::init_logging) drops every event below `ERROR`.
//! Results and error messages are unaffected. The flag is read on every log
//! event, so it can be flipped at any time, before or after logging is set up.
//!
//! ```rust
//! use pdbenum_utils::quiet;
//!
//! quiet::set_quiet(true);
//! assert!(quiet::is_quiet());
//! quiet::set_quiet(false);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::Level;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Turn quiet mode on or off.
pub fn set_quiet(quiet: bool)
{
    QUIET.store(quiet, Ordering::Relaxed);
}

/// Whether quiet mode is on.
pub fn is_quiet() -> bool
{
    QUIET.load(Ordering::Relaxed)
}

/// Whether an event at `level` should reach the console right now
pub fn allows(level: &Level) -> bool
{
    *level == Level::ERROR || !is_quiet()
}
