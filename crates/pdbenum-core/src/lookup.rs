//! # Lookup Pipeline
//!
//! The end-to-end flow behind every command: find the module in the process,
//! start a symbol session, load the module, read its debug information, run
//! one search, and clean the session up again, on every path.
//!
//! The pipeline is generic over the backend and the locator, so the same code
//! runs against `dbghelp`/`psapi` on Windows and against scripted fakes in
//! tests. Failures never discard what was already gathered: a result that
//! failed after the module was found still carries the module.

use tracing::{debug, info};

use crate::backend::SymbolBackend;
use crate::engine::SymbolEngine;
use crate::error::{PdbEnumError, PdbEnumResult};
use crate::locator::ModuleLocator;
use crate::report::{BatchSearchResult, SearchResult, SymbolListResult};
use crate::types::{Address, DebugInfo, ModuleDescriptor, ProcessHandle, ProcessId};

/// What to look in
#[derive(Debug, Clone, Copy)]
pub struct Target<'a>
{
    /// Opened process (borrowed, never closed here)
    pub process: ProcessHandle,
    /// Its PID, for messages
    pub pid: ProcessId,
    /// File name of the module to search, e.g. `ntdll.dll`
    pub module_name: &'a str,
    /// Backend search path; `None` uses the engine default
    pub search_path: Option<&'a str>,
}

#[derive(Debug, Default)]
struct Gathered
{
    module: Option<ModuleDescriptor>,
    debug_info: Option<DebugInfo>,
}

/// Search for a single name.
pub fn find_symbol<B, L>(backend: B, locator: &L, target: &Target<'_>, name: &str) -> SearchResult
where
    B: SymbolBackend,
    L: ModuleLocator,
{
    let mut gathered = Gathered::default();
    let outcome = run_session(backend, locator, target, &mut gathered, |engine| {
        info!("Searching for symbol containing '{name}'...");
        engine.find_symbol(name)
    });

    let mut result = SearchResult {
        module: gathered.module,
        debug_info: gathered.debug_info,
        ..SearchResult::default()
    };
    match outcome {
        Ok(symbol) => {
            result.symbol = symbol;
            result.searched_name = Some(name.to_string());
            result.success = true;
        }
        Err(err) => result.error_message = Some(err.to_string()),
    }
    result
}

/// Search for several names in one enumeration pass.
pub fn find_symbols<B, L, S>(backend: B, locator: &L, target: &Target<'_>, names: &[S]) -> BatchSearchResult
where
    B: SymbolBackend,
    L: ModuleLocator,
    S: AsRef<str>,
{
    let mut gathered = Gathered::default();
    let outcome = run_session(backend, locator, target, &mut gathered, |engine| {
        info!("Searching for {} symbols...", names.len());
        engine.find_symbols(names)
    });

    let entries = outcome.map(|found| {
        names
            .iter()
            .zip(found)
            .map(|(name, symbol)| {
                let name: &str = name.as_ref();
                SearchResult::entry(name, symbol)
            })
            .collect()
    });
    batch_result(gathered, entries)
}

/// Resolve addresses to the symbols starting at them, in one enumeration pass.
pub fn resolve_addresses<B, L>(backend: B, locator: &L, target: &Target<'_>, addresses: &[Address])
    -> BatchSearchResult
where
    B: SymbolBackend,
    L: ModuleLocator,
{
    let mut gathered = Gathered::default();
    let outcome = run_session(backend, locator, target, &mut gathered, |engine| {
        info!("Resolving {} addresses...", addresses.len());
        engine.resolve_addresses(addresses)
    });

    let entries = outcome.map(|records| {
        addresses
            .iter()
            .zip(records)
            .map(|(address, record)| SearchResult::for_address(*address, record))
            .collect()
    });
    batch_result(gathered, entries)
}

/// List every symbol matching `mask` (default `*`).
pub fn list_symbols<B, L>(backend: B, locator: &L, target: &Target<'_>, mask: Option<&str>) -> SymbolListResult
where
    B: SymbolBackend,
    L: ModuleLocator,
{
    let mut gathered = Gathered::default();
    let outcome = run_session(backend, locator, target, &mut gathered, |engine| {
        info!("Enumerating symbols...");
        engine.symbols(mask)
    });

    let mut result = SymbolListResult {
        module: gathered.module,
        debug_info: gathered.debug_info,
        mask: mask.filter(|mask| !mask.is_empty()).unwrap_or(crate::engine::WILDCARD).to_string(),
        ..SymbolListResult::default()
    };
    match outcome {
        Ok(symbols) => {
            result.symbols = symbols;
            result.success = true;
        }
        Err(err) => result.error_message = Some(err.to_string()),
    }
    result
}

/// Module and debug-information metadata only, no symbol search.
pub fn describe_module<B, L>(backend: B, locator: &L, target: &Target<'_>) -> SearchResult
where
    B: SymbolBackend,
    L: ModuleLocator,
{
    let mut gathered = Gathered::default();
    let outcome = run_session(backend, locator, target, &mut gathered, |_| Ok(()));

    SearchResult {
        module: gathered.module,
        debug_info: gathered.debug_info,
        success: outcome.is_ok(),
        error_message: outcome.err().map(|err| err.to_string()),
        ..SearchResult::default()
    }
}

fn batch_result(gathered: Gathered, entries: PdbEnumResult<Vec<SearchResult>>) -> BatchSearchResult
{
    let mut result = BatchSearchResult {
        module: gathered.module,
        debug_info: gathered.debug_info,
        ..BatchSearchResult::default()
    };
    match entries {
        Ok(symbols) => {
            result.symbols = symbols;
            result.success = true;
            debug!("{} of {} lookups found a symbol", result.found_count(), result.symbols.len());
        }
        Err(err) => result.error_message = Some(err.to_string()),
    }
    result
}

fn run_session<B, L, T, F>(backend: B, locator: &L, target: &Target<'_>, gathered: &mut Gathered, search: F)
    -> PdbEnumResult<T>
where
    B: SymbolBackend,
    L: ModuleLocator,
    F: FnOnce(&SymbolEngine<B>) -> PdbEnumResult<T>,
{
    info!("Finding module '{}'...", target.module_name);
    let module = locator
        .find_module(target.process, target.module_name)?
        .ok_or_else(|| PdbEnumError::ModuleNotFound {
            module: target.module_name.to_string(),
            pid: target.pid.0,
        })?;
    debug!("{module}");
    gathered.module = Some(module.clone());

    let mut engine = SymbolEngine::new(backend, target.process);
    let outcome = search_loaded(&mut engine, &module, target.search_path, gathered, search);
    engine.cleanup();
    outcome
}

fn search_loaded<B, T, F>(
    engine: &mut SymbolEngine<B>,
    module: &ModuleDescriptor,
    search_path: Option<&str>,
    gathered: &mut Gathered,
    search: F,
) -> PdbEnumResult<T>
where
    B: SymbolBackend,
    F: FnOnce(&SymbolEngine<B>) -> PdbEnumResult<T>,
{
    info!("Initializing symbol handler...");
    engine.initialize(search_path)?;

    info!("Loading symbols for '{}'... (this may take a while if the PDB needs to be downloaded)", module.name);
    engine.load_module(&module.full_path, module.base_address, module.size)?;

    let debug_info = engine.debug_info()?;
    debug!("{debug_info}");
    gathered.debug_info = Some(debug_info);

    search(&*engine)
}
