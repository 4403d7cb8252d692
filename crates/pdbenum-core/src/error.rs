//! # Error Types
//!
//! General error handling for symbol resolution.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! "Not found" outcomes (a symbol that matches nothing, an address no symbol
//! starts at, a module the process never loaded) are *not* errors. They are
//! modelled as empty results so partial output stays valid.

use thiserror::Error;

use crate::backend::PlatformError;
use crate::engine::SessionState;
use crate::types::Address;

/// Main error type for symbol resolution
///
/// ## Error Categories
///
/// 1. **Lifecycle errors**: InvalidState (caller bug, never retried)
/// 2. **Backend errors**: BackendInit, LoadModuleFailed, BackendQueryFailed, ModuleNotRegistered
/// 3. **Discovery errors**: EnumerationFailed, ModuleNotFound, ProcessOpenFailed
/// 4. **Environment errors**: BackendUnavailable, UnsupportedPlatform
/// 5. **Output errors**: Serialization, Io
#[derive(Error, Debug)]
pub enum PdbEnumError
{
    /// An engine operation was invoked out of lifecycle order
    ///
    /// For example `load_module()` before `initialize()`, or a search before
    /// a module is loaded. No backend call is made when this is returned.
    #[error("{operation} requires the session to be {required}, but it is {actual}")]
    InvalidState
    {
        /// Engine operation that was rejected
        operation: &'static str,
        /// Minimum state the operation needs
        required: SessionState,
        /// State the session was actually in
        actual: SessionState,
    },

    /// The backend refused to initialize a symbol session for the process
    #[error("SymInitialize failed with error: {}", .code.code())]
    BackendInit
    {
        /// Platform error code reported by the backend
        code: PlatformError,
    },

    /// The backend failed to load module debug information
    #[error("SymLoadModuleEx failed for {path} with error: {}", .code.code())]
    LoadModuleFailed
    {
        /// Image path handed to the backend
        path: String,
        /// Platform error code reported by the backend
        code: PlatformError,
    },

    /// The backend claimed the module was already loaded, but has no module at that base
    #[error("Module at base address {base} is not loaded in the symbol handler")]
    ModuleNotRegistered
    {
        /// Base address the caller asked for
        base: Address,
    },

    /// A metadata query against the backend failed
    #[error("{operation} failed with error: {}", .code.code())]
    BackendQueryFailed
    {
        /// Backend call that failed
        operation: &'static str,
        /// Platform error code reported by the backend
        code: PlatformError,
    },

    /// Enumerating the modules of the target process failed outright
    #[error("EnumProcessModules failed with error: {}", .code.code())]
    EnumerationFailed
    {
        /// Platform error code reported by the module enumeration call
        code: PlatformError,
    },

    /// The requested module is not loaded in the target process
    #[error("Module '{module}' not found in process {pid}")]
    ModuleNotFound
    {
        /// Module file name that was searched for
        module: String,
        /// Target process
        pid: u32,
    },

    /// The target process could not be opened
    #[error("Failed to open process {pid}. Error: {}. Make sure you have appropriate permissions.", .code.code())]
    ProcessOpenFailed
    {
        /// Target process
        pid: u32,
        /// Platform error code reported by the open call
        code: PlatformError,
    },

    /// The symbol backend library could not be found or loaded
    #[error("Failed to load the symbol backend from {path} (error {})", .code.code())]
    BackendUnavailable
    {
        /// Library path that was tried
        path: String,
        /// Platform error code (2 = file not found)
        code: PlatformError,
    },

    /// Native symbol resolution is only available on Windows hosts
    #[error("Symbol resolution against live processes is only supported on Windows")]
    UnsupportedPlatform,

    /// A result could not be rendered in the requested output format
    #[error("Failed to serialize result: {0}")]
    Serialization(String),

    /// I/O error (writing output, creating the symbol cache, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, PdbEnumError>`
///
/// ```rust
/// use pdbenum_core::error::PdbEnumResult;
/// fn foo() -> PdbEnumResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type PdbEnumResult<T> = std::result::Result<T, PdbEnumError>;
