//! # Symbol Backend Capability
//!
//! The engine never parses debug information itself. Everything goes through a
//! [`SymbolBackend`]: an opaque, handle-keyed symbol handler in the style of
//! Windows `dbghelp`. On Windows the real implementation is
//! [`DbgHelp`](crate::platform::windows::DbgHelp); tests script an in-memory
//! backend instead.
//!
//! ## Calling convention
//!
//! Methods map 1:1 onto the backend's native calls, including its warts. In
//! particular [`SymbolBackend::load_module`] reports failure as
//! `Err(PlatformError)` where the code **may be zero**. Zero means "the module
//! was already registered", which only the engine knows how to recover from.
//!
//! ## Enumeration
//!
//! Enumeration is push-style. The backend calls the visitor once per symbol
//! with a borrowed [`SymbolView`] and stops as soon as the visitor returns
//! [`ControlFlow::Break`]. A view never outlives its callback.

use std::fmt;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use uuid::Uuid;

use crate::types::{Address, ProcessHandle, SymbolKind, SymbolRecord};

/// Platform error code captured right after a failed backend call
///
/// On Windows this is the `GetLastError()` value. A code of `0` means the call
/// failed without the platform recording a reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformError(pub u32);

impl PlatformError
{
    /// `ERROR_FILE_NOT_FOUND`
    pub const FILE_NOT_FOUND: Self = PlatformError(2);

    /// The raw error code
    pub const fn code(self) -> u32
    {
        self.0
    }

    /// Whether the platform recorded no error at all
    pub const fn is_zero(self) -> bool
    {
        self.0 == 0
    }
}

impl fmt::Display for PlatformError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "error {}", self.0)
    }
}

bitflags! {
    /// Backend session options (`SYMOPT_*`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SymOptions: u32
    {
        /// Undecorate C++ names
        const UNDNAME = 0x0000_0002;
        /// Load line-number information
        const LOAD_LINES = 0x0000_0010;
        /// Don't pop up critical-error dialogs
        const FAIL_CRITICAL_ERRORS = 0x0000_0200;
        /// Report absolute symbols
        const ALLOW_ABSOLUTE_SYMBOLS = 0x0000_0400;
        /// Include 32-bit modules when inspecting a WOW64 process
        const INCLUDE_32BIT_MODULES = 0x0000_2000;
        /// Emit backend debug output
        const DEBUG = 0x8000_0000;

        // Bits we don't name are still carried through untouched.
        const _ = !0;
    }
}

impl SymOptions
{
    /// Options every session is switched to after initialization.
    pub const SESSION: Self = Self::UNDNAME
        .union(Self::LOAD_LINES)
        .union(Self::FAIL_CRITICAL_ERRORS)
        .union(Self::ALLOW_ABSOLUTE_SYMBOLS)
        .union(Self::INCLUDE_32BIT_MODULES)
        .union(Self::DEBUG);
}

/// Module metadata as reported by the backend (`IMAGEHLP_MODULE64`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendModuleInfo
{
    /// Base the backend registered the module at
    pub base_address: Address,
    /// Image size
    pub image_size: u32,
    /// Kind of debug information that got loaded
    pub symbol_kind: SymbolKind,
    /// Image file the backend opened
    pub loaded_image_name: String,
    /// PDB file the backend opened, empty when none
    pub loaded_pdb_name: String,
    /// PDB signature (`PdbSig70`)
    pub pdb_guid: Uuid,
    /// PDB age
    pub pdb_age: u32,
}

/// One symbol as seen from inside an enumeration callback
///
/// Borrows backend-owned memory. Call [`SymbolView::to_record`] to keep it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolView<'a>
{
    /// Symbol name
    pub name: &'a str,
    /// Symbol address
    pub address: Address,
    /// Size in bytes
    pub size: u32,
    /// `SYMFLAG_*` bits
    pub flags: u32,
    /// `SymTag` value
    pub tag: u32,
}

impl SymbolView<'_>
{
    /// Copy the view into an owned record.
    pub fn to_record(&self) -> SymbolRecord
    {
        SymbolRecord {
            name: self.name.to_owned(),
            address: self.address,
            size: self.size,
            flags: self.flags,
            tag: self.tag,
        }
    }
}

/// Visitor invoked once per enumerated symbol
pub type SymbolVisitor<'v> = dyn FnMut(SymbolView<'_>) -> ControlFlow<()> + 'v;

/// Native symbol handler keyed by process handle
///
/// Implementations are not expected to be thread-safe; the engine drives one
/// backend from one thread.
pub trait SymbolBackend
{
    /// Start a symbol session for `process` (`SymInitialize`)
    fn initialize(&mut self, process: ProcessHandle, search_path: &str, invade_process: bool)
        -> Result<(), PlatformError>;

    /// Current session options (`SymGetOptions`)
    fn options(&self) -> SymOptions;

    /// Replace the session options and return what is now in effect (`SymSetOptions`)
    fn set_options(&mut self, options: SymOptions) -> SymOptions;

    /// Register a module and load its debug information (`SymLoadModuleEx`)
    ///
    /// Returns the module base on success. A failure with a zero code means the
    /// module was already registered for this process.
    fn load_module(&mut self, process: ProcessHandle, image_path: &str, base: Address, size: u32)
        -> Result<Address, PlatformError>;

    /// Base of the registered module containing `address` (`SymGetModuleBase64`)
    ///
    /// `None` when no registered module covers the address.
    fn module_base(&self, process: ProcessHandle, address: Address) -> Option<Address>;

    /// Debug-information metadata for the module at `base` (`SymGetModuleInfo64`)
    fn module_info(&self, process: ProcessHandle, base: Address) -> Result<BackendModuleInfo, PlatformError>;

    /// Visit the symbols of the module at `base` whose names match `mask` (`SymEnumSymbols`)
    fn enumerate_symbols(
        &self,
        process: ProcessHandle,
        base: Address,
        mask: &str,
        visitor: &mut SymbolVisitor<'_>,
    ) -> Result<(), PlatformError>;

    /// Unregister the module at `base` (`SymUnloadModule64`)
    fn unload_module(&mut self, process: ProcessHandle, base: Address) -> Result<(), PlatformError>;

    /// Tear down the session for `process` (`SymCleanup`)
    fn cleanup(&mut self, process: ProcessHandle) -> Result<(), PlatformError>;
}

impl<B: SymbolBackend + ?Sized> SymbolBackend for Box<B>
{
    fn initialize(&mut self, process: ProcessHandle, search_path: &str, invade_process: bool)
        -> Result<(), PlatformError>
    {
        (**self).initialize(process, search_path, invade_process)
    }

    fn options(&self) -> SymOptions
    {
        (**self).options()
    }

    fn set_options(&mut self, options: SymOptions) -> SymOptions
    {
        (**self).set_options(options)
    }

    fn load_module(&mut self, process: ProcessHandle, image_path: &str, base: Address, size: u32)
        -> Result<Address, PlatformError>
    {
        (**self).load_module(process, image_path, base, size)
    }

    fn module_base(&self, process: ProcessHandle, address: Address) -> Option<Address>
    {
        (**self).module_base(process, address)
    }

    fn module_info(&self, process: ProcessHandle, base: Address) -> Result<BackendModuleInfo, PlatformError>
    {
        (**self).module_info(process, base)
    }

    fn enumerate_symbols(
        &self,
        process: ProcessHandle,
        base: Address,
        mask: &str,
        visitor: &mut SymbolVisitor<'_>,
    ) -> Result<(), PlatformError>
    {
        (**self).enumerate_symbols(process, base, mask, visitor)
    }

    fn unload_module(&mut self, process: ProcessHandle, base: Address) -> Result<(), PlatformError>
    {
        (**self).unload_module(process, base)
    }

    fn cleanup(&mut self, process: ProcessHandle) -> Result<(), PlatformError>
    {
        (**self).cleanup(process)
    }
}

/// Which build of the backend library the host needs
///
/// The backend ships as two libraries with one logical API, one per pointer
/// width. The variant is fixed by the host at compile time; nothing below the
/// library loader branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendVariant
{
    /// 64-bit host
    X64,
    /// 32-bit host
    X86,
}

impl BackendVariant
{
    /// Variant matching the pointer width of this build
    pub const fn host() -> Self
    {
        if cfg!(target_pointer_width = "64") {
            BackendVariant::X64
        } else {
            BackendVariant::X86
        }
    }

    /// Runtime directory the matching library lives in
    pub const fn runtime_dir(self) -> &'static str
    {
        match self {
            BackendVariant::X64 => "win-x64",
            BackendVariant::X86 => "win-x86",
        }
    }

    /// Where the private `dbghelp.dll` is expected, relative to the executable
    ///
    /// `<exe dir>/runtimes/<runtime dir>/dbghelp.dll`
    pub fn library_path(self, executable: &Path) -> PathBuf
    {
        executable
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("runtimes")
            .join(self.runtime_dir())
            .join("dbghelp.dll")
    }
}

impl fmt::Display for BackendVariant
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.runtime_dir())
    }
}
