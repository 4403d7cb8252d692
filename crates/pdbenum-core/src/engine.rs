//! # Symbol Resolution Engine
//!
//! [`SymbolEngine`] owns one symbol session bound to one process handle and
//! walks it through its lifecycle:
//!
//! ```text
//! Uninitialized --initialize--> Initialized --load_module--> ModuleLoaded
//!       ^                                                         |
//!       +---------------------------cleanup-----------------------+
//! ```
//!
//! `cleanup()` is legal from every state, any number of times, and never fails.
//! Every other operation checks the state first and returns
//! [`PdbEnumError::InvalidState`] without touching the backend when it is
//! called out of order.
//!
//! ## Searching
//!
//! All searches share one mechanism: a single pass of the backend's symbol
//! enumeration with a visitor that decides when to stop.
//!
//! - [`SymbolEngine::find_symbol`]: first symbol whose name contains the term
//!   (case-insensitive), in whatever order the backend enumerates.
//! - [`SymbolEngine::find_symbols`]: the same for many terms in one pass.
//! - [`SymbolEngine::resolve_addresses`]: exact address matches for many
//!   addresses in one pass, stopping once every address is resolved.
//! - [`SymbolEngine::symbols`]: everything matching a mask.
//!
//! A failing enumeration is logged and yields whatever was found so far. It is
//! never an error.
//!
//! ## Thread Safety
//!
//! The engine is **not** thread-safe and does no locking. Use one engine per
//! process handle, from one thread.
//!
//! ## Example
//!
//! ```rust,no_run
//! # fn example<B: pdbenum_core::backend::SymbolBackend>(backend: B, process: pdbenum_core::types::ProcessHandle, module: pdbenum_core::types::ModuleDescriptor) -> pdbenum_core::PdbEnumResult<()> {
//! use pdbenum_core::SymbolEngine;
//!
//! let mut engine = SymbolEngine::new(backend, process);
//! engine.initialize(None)?;
//! engine.load_module(&module.full_path, module.base_address, module.size)?;
//! if let Some(symbol) = engine.find_symbol("CreateFile")? {
//!     println!("{symbol}");
//! }
//! engine.cleanup();
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::backend::{PlatformError, SymOptions, SymbolBackend, SymbolVisitor};
use crate::error::{PdbEnumError, PdbEnumResult};
use crate::symbol_path;
use crate::types::{Address, DebugInfo, ProcessHandle, SymbolKind, SymbolRecord};

/// Mask matching every symbol name
pub const WILDCARD: &str = "*";

/// Where a session is in its lifecycle
///
/// States are ordered: an operation that needs `Initialized` also works in
/// `ModuleLoaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState
{
    /// No backend session exists
    Uninitialized,
    /// The backend session exists, no module is loaded
    Initialized,
    /// A module is loaded and can be searched
    ModuleLoaded,
}

impl fmt::Display for SessionState
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initialized => "initialized",
            SessionState::ModuleLoaded => "module-loaded",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session
{
    Uninitialized,
    Initialized,
    ModuleLoaded(Address),
}

impl Session
{
    fn state(self) -> SessionState
    {
        match self {
            Session::Uninitialized => SessionState::Uninitialized,
            Session::Initialized => SessionState::Initialized,
            Session::ModuleLoaded(_) => SessionState::ModuleLoaded,
        }
    }
}

/// Symbol session for one process, driven through a [`SymbolBackend`]
///
/// The process handle is borrowed for the engine's lifetime and never closed by
/// it. Dropping an engine that still has a live session cleans the session up.
pub struct SymbolEngine<B: SymbolBackend>
{
    backend: B,
    process: ProcessHandle,
    session: Session,
}

impl<B: SymbolBackend> SymbolEngine<B>
{
    /// Bind a new, uninitialized engine to `process`.
    pub fn new(backend: B, process: ProcessHandle) -> Self
    {
        Self {
            backend,
            process,
            session: Session::Uninitialized,
        }
    }

    /// Process handle this engine's session is keyed by
    pub fn process(&self) -> ProcessHandle
    {
        self.process
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState
    {
        self.session.state()
    }

    /// Base of the loaded module, `None` unless a module is loaded
    pub fn module_base(&self) -> Option<Address>
    {
        match self.session {
            Session::ModuleLoaded(base) => Some(base),
            _ => None,
        }
    }

    /// The backend this engine drives
    pub fn backend(&self) -> &B
    {
        &self.backend
    }

    /// Start the symbol session
    ///
    /// With no (or an empty) `search_path`, a default is used: a local cache
    /// under the temp directory in front of the public symbol store (see
    /// [`symbol_path::default_search_path`]). The backend never invades the
    /// process, so the target's modules are only known once loaded explicitly.
    ///
    /// After the session starts, [`SymOptions::SESSION`] is OR-ed into the
    /// backend's current options; bits that were already set stay set.
    ///
    /// ## Errors
    ///
    /// - `InvalidState`: a session is already running
    /// - `BackendInit`: the backend refused; carries the platform error code
    pub fn initialize(&mut self, search_path: Option<&str>) -> PdbEnumResult<()>
    {
        if self.session != Session::Uninitialized {
            return Err(PdbEnumError::InvalidState {
                operation: "initialize",
                required: SessionState::Uninitialized,
                actual: self.state(),
            });
        }

        let search_path = match search_path.filter(|path| !path.is_empty()) {
            Some(path) => path.to_string(),
            None => symbol_path::default_search_path(),
        };
        debug!("Symbol path: {search_path}");

        self.backend
            .initialize(self.process, &search_path, false)
            .map_err(|code| PdbEnumError::BackendInit { code })?;

        let requested = self.backend.options() | SymOptions::SESSION;
        let applied = self.backend.set_options(requested);
        debug!("Symbol options set: 0x{:X}", applied.bits());

        self.session = Session::Initialized;
        Ok(())
    }

    /// Load debug information for the module mapped at `base`
    ///
    /// May block for a long time while the backend downloads a PDB from the
    /// symbol store. Returns the base the backend registered the module at.
    ///
    /// If the backend reports that the module was already registered, the
    /// engine asks it which module covers `base` and continues with that. A
    /// module with only exports available loads successfully; the missing PDB
    /// is reported as a warning.
    ///
    /// ## Errors
    ///
    /// - `InvalidState`: `initialize()` has not been called
    /// - `LoadModuleFailed`: the backend failed with a nonzero error code
    /// - `ModuleNotRegistered`: the backend said "already loaded" but knows no module at `base`
    pub fn load_module(&mut self, image_path: &str, base: Address, size: u32) -> PdbEnumResult<Address>
    {
        self.require("load_module", SessionState::Initialized)?;

        debug!("Loading module: {image_path}");
        debug!("Base address: {base}");
        debug!("Size: {size} bytes");

        let module_base = match self.backend.load_module(self.process, image_path, base, size) {
            Ok(module_base) if !module_base.is_null() => module_base,
            Ok(_) => self.registered_module_base(base, PlatformError(0))?,
            Err(code) if code.is_zero() => self.registered_module_base(base, code)?,
            Err(code) => {
                return Err(PdbEnumError::LoadModuleFailed {
                    path: image_path.to_string(),
                    code,
                });
            }
        };
        debug!("Module loaded at base: {module_base}");

        match self.backend.module_info(self.process, module_base) {
            Ok(info) => {
                debug!("Registered at {} ({} bytes)", info.base_address, info.image_size);
                debug!("Symbol type: {}", info.symbol_kind);
                debug!("Loaded image: {}", info.loaded_image_name);
                debug!("Loaded PDB: {}", info.loaded_pdb_name);
                if info.symbol_kind == SymbolKind::Export {
                    warn!("Only exports loaded for {image_path} - PDB not found or failed to load");
                }
            }
            Err(code) => debug!("SymGetModuleInfo64 failed after load with {code}"),
        }

        self.session = Session::ModuleLoaded(module_base);
        Ok(module_base)
    }

    fn registered_module_base(&self, base: Address, code: PlatformError) -> PdbEnumResult<Address>
    {
        debug!("SymLoadModuleEx returned 0 with {code}, looking for an already loaded module");
        match self.backend.module_base(self.process, base) {
            Some(existing) if !existing.is_null() => {
                debug!("Module was already loaded at base: {existing}");
                Ok(existing)
            }
            _ => Err(PdbEnumError::ModuleNotRegistered { base }),
        }
    }

    /// Debug-information metadata for the loaded module
    ///
    /// ## Errors
    ///
    /// - `InvalidState`: no module is loaded
    /// - `BackendQueryFailed`: the backend query failed
    pub fn debug_info(&self) -> PdbEnumResult<DebugInfo>
    {
        let base = self.require_module("debug_info")?;
        let info = self
            .backend
            .module_info(self.process, base)
            .map_err(|code| PdbEnumError::BackendQueryFailed {
                operation: "SymGetModuleInfo64",
                code,
            })?;

        Ok(DebugInfo {
            guid: info.pdb_guid,
            age: info.pdb_age,
            file_name: info.loaded_pdb_name,
            symbol_kind: info.symbol_kind,
        })
    }

    /// First symbol whose name contains `term`, ignoring case
    ///
    /// "First" is the backend's enumeration order, which is neither alphabetical
    /// nor by address. `Ok(None)` when nothing matches.
    ///
    /// ## Errors
    ///
    /// - `InvalidState`: no module is loaded
    pub fn find_symbol(&self, term: &str) -> PdbEnumResult<Option<SymbolRecord>>
    {
        let needle = term.to_lowercase();
        let mut found = None;

        self.scan("find_symbol", WILDCARD, &mut |view| {
            if view.name.to_lowercase().contains(&needle) {
                found = Some(view.to_record());
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;

        Ok(found)
    }

    /// [`find_symbol`](Self::find_symbol) for several terms in a single pass
    ///
    /// Entry `i` of the result is exactly what `find_symbol(terms[i])` would
    /// return. The pass stops once every term has a match.
    ///
    /// ## Errors
    ///
    /// - `InvalidState`: no module is loaded
    pub fn find_symbols<S: AsRef<str>>(&self, terms: &[S]) -> PdbEnumResult<Vec<Option<SymbolRecord>>>
    {
        self.require_module("find_symbols")?;

        let needles: Vec<String> = terms.iter().map(|term| term.as_ref().to_lowercase()).collect();
        let mut found: Vec<Option<SymbolRecord>> = vec![None; needles.len()];
        let mut remaining = needles.len();
        if remaining == 0 {
            return Ok(found);
        }

        self.scan("find_symbols", WILDCARD, &mut |view| {
            let name = view.name.to_lowercase();
            for (slot, needle) in found.iter_mut().zip(&needles) {
                if slot.is_none() && name.contains(needle.as_str()) {
                    *slot = Some(view.to_record());
                    remaining -= 1;
                }
            }
            if remaining == 0 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;

        Ok(found)
    }

    /// Resolve many addresses to the symbols starting exactly there, in one pass
    ///
    /// The result has one entry per requested address, in request order,
    /// duplicates included. Every entry sharing an address is filled from the
    /// first symbol enumerated at that address. Addresses no symbol starts at
    /// stay [placeholders](SymbolRecord::placeholder).
    ///
    /// ## Errors
    ///
    /// - `InvalidState`: no module is loaded
    pub fn resolve_addresses(&self, addresses: &[Address]) -> PdbEnumResult<Vec<SymbolRecord>>
    {
        self.require_module("resolve_addresses")?;

        let mut records: Vec<SymbolRecord> = addresses.iter().copied().map(SymbolRecord::placeholder).collect();
        let mut pending: HashMap<Address, SmallVec<[usize; 2]>> = HashMap::with_capacity(addresses.len());
        for (index, address) in addresses.iter().enumerate() {
            pending.entry(*address).or_default().push(index);
        }
        if pending.is_empty() {
            return Ok(records);
        }
        let wanted = pending.len();

        self.scan("resolve_addresses", WILDCARD, &mut |view| {
            // Unnamed entries would read back as placeholders; keep waiting for a named one.
            if view.name.is_empty() {
                return ControlFlow::Continue(());
            }
            if let Some(indices) = pending.remove(&view.address) {
                let record = view.to_record();
                for index in indices {
                    records[index].clone_from(&record);
                }
            }
            if pending.is_empty() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;

        debug!("Resolved {} of {wanted} distinct addresses", wanted - pending.len());
        Ok(records)
    }

    /// Every symbol whose name matches `mask` (default `*`), in enumeration order
    ///
    /// ## Errors
    ///
    /// - `InvalidState`: no module is loaded
    pub fn symbols(&self, mask: Option<&str>) -> PdbEnumResult<Vec<SymbolRecord>>
    {
        let mask = mask.filter(|mask| !mask.is_empty()).unwrap_or(WILDCARD);
        let mut symbols = Vec::new();

        self.scan("symbols", mask, &mut |view| {
            symbols.push(view.to_record());
            ControlFlow::Continue(())
        })?;

        Ok(symbols)
    }

    /// End the session
    ///
    /// Unloads the module (if any), then tears down the backend session. Backend
    /// failures are logged and ignored; the engine is `Uninitialized` afterwards
    /// no matter what, so calling this again is always safe.
    pub fn cleanup(&mut self)
    {
        if let Session::ModuleLoaded(base) = self.session {
            if let Err(code) = self.backend.unload_module(self.process, base) {
                debug!("SymUnloadModule64 failed for {base} with {code}");
            }
        }
        if let Err(code) = self.backend.cleanup(self.process) {
            debug!("SymCleanup failed with {code}");
        }
        self.session = Session::Uninitialized;
    }

    fn scan(&self, operation: &'static str, mask: &str, visitor: &mut SymbolVisitor<'_>) -> PdbEnumResult<()>
    {
        let base = self.require_module(operation)?;
        if let Err(code) = self.backend.enumerate_symbols(self.process, base, mask, visitor) {
            debug!("SymEnumSymbols failed during {operation} with {code}");
        }
        Ok(())
    }

    fn require(&self, operation: &'static str, required: SessionState) -> PdbEnumResult<()>
    {
        let actual = self.state();
        if actual < required {
            return Err(PdbEnumError::InvalidState {
                operation,
                required,
                actual,
            });
        }
        Ok(())
    }

    fn require_module(&self, operation: &'static str) -> PdbEnumResult<Address>
    {
        self.require(operation, SessionState::ModuleLoaded)?;
        self.module_base().ok_or(PdbEnumError::InvalidState {
            operation,
            required: SessionState::ModuleLoaded,
            actual: self.state(),
        })
    }
}

impl<B: SymbolBackend> Drop for SymbolEngine<B>
{
    fn drop(&mut self)
    {
        if self.session != Session::Uninitialized {
            self.cleanup();
        }
    }
}
