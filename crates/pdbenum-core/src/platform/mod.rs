//! # Platform-Specific Implementations
//!
//! Native implementations of the engine's capabilities.
//!
//! - **Windows**: `dbghelp.dll` as the [`SymbolBackend`](crate::backend::SymbolBackend),
//!   `psapi` as the [`ModuleLocator`](crate::locator::ModuleLocator), and an
//!   owned process handle.
//!   - See: [DbgHelp Functions](https://learn.microsoft.com/en-us/windows/win32/debug/dbghelp-functions)
//!
//! Other hosts build the portable engine only. The command-line tool reports
//! [`UnsupportedPlatform`](crate::error::PdbEnumError::UnsupportedPlatform) there.

#[cfg(windows)]
pub mod windows;
