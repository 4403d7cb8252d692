//! # pdbenum-core
//!
//! Debug symbol resolution for modules loaded in a running process.
//!
//! Given a process and the file name of one of its modules, this crate loads
//! the module's debug information (downloading the PDB from a symbol server if
//! needed) and answers questions about it:
//! - Which symbol's name contains a given string?
//! - Which symbols start at these addresses?
//! - What does the module export or define at all?
//!
//! ## Layers
//!
//! - [`engine`]: the session state machine and search algorithms, written
//!   against the [`backend::SymbolBackend`] capability
//! - [`lookup`]: locate module, load, search, clean up, as one call
//! - [`output`]: human, JSON and XML rendering of the results
//! - [`platform`]: the Windows `dbghelp`/`psapi` implementations
//!
//! ## Platform Support
//!
//! - **Windows**: full support through a private `dbghelp.dll`
//! - **Other hosts**: the engine, pipeline and formatter build and run against
//!   any backend, but there is no native backend
//!
//! ## Why unsafe code is needed
//!
//! The Windows backend calls into `dbghelp.dll` through function pointers
//! resolved at runtime and hands it a callback. Those calls are wrapped in safe
//! types; nothing outside `platform::windows` uses `unsafe`.

#![allow(unsafe_code)] // Required for the dbghelp and psapi FFI

pub mod backend;
pub mod engine;
pub mod error;
pub mod locator;
pub mod lookup;
pub mod output;
pub mod platform;
pub mod prelude;
pub mod report;
pub mod symbol_path;
pub mod types;

pub use engine::{SessionState, SymbolEngine};
pub use error::{PdbEnumError, PdbEnumResult};
