//! # Windows Implementation
//!
//! - [`DbgHelp`]: the symbol backend, loaded at runtime from a private copy of
//!   `dbghelp.dll` (the system copy lacks a working `symsrv.dll` next to it).
//! - [`PsapiModuleLocator`]: finds modules in the target with
//!   `EnumProcessModules`.
//! - [`OwnedProcess`]: an opened process handle, closed on drop.
//!
//! ## Dependencies
//!
//! - **windows-sys**: `LoadLibraryExW`, `OpenProcess`, the `psapi` calls and
//!   `GetLastError`.
//! - **Hand-written `repr(C)`**: the `dbghelp` entry points and structures.
//!   They are resolved with `GetProcAddress` because the library is loaded
//!   from a path chosen at runtime.
//!
//! ## References
//!
//! - [SymLoadModuleEx](https://learn.microsoft.com/en-us/windows/win32/api/dbghelp/nf-dbghelp-symloadmoduleex)
//! - [EnumProcessModules](https://learn.microsoft.com/en-us/windows/win32/api/psapi/nf-psapi-enumprocessmodules)

pub mod dbghelp;
pub mod ffi;
pub mod process;
pub mod psapi;

pub use dbghelp::DbgHelp;
pub use process::OwnedProcess;
pub use psapi::PsapiModuleLocator;
