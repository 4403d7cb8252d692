//! Tests for the symbol engine lifecycle and searches

mod common;

use common::{export_info, pdb_guid, FakeBackend, LoadBehavior, MODULE_BASE, MODULE_SIZE, PROCESS, SYMBOL_PATH};
use pdbenum_core::backend::{PlatformError, SymOptions};
use pdbenum_core::error::PdbEnumError;
use pdbenum_core::types::{Address, SymbolKind};
use pdbenum_core::{SessionState, SymbolEngine};

const IMAGE: &str = r"C:\Windows\System32\ntdll.dll";

fn loaded(backend: FakeBackend) -> SymbolEngine<FakeBackend>
{
    let mut engine = SymbolEngine::new(backend, PROCESS);
    engine.initialize(Some(SYMBOL_PATH)).unwrap();
    engine.load_module(IMAGE, Address::new(MODULE_BASE), MODULE_SIZE).unwrap();
    engine
}

fn file_apis() -> FakeBackend
{
    FakeBackend::new().with_symbols(&[
        ("RtlInitUnicodeString", 0x1000),
        ("NtCreateFile", 0x2000),
        ("CreateFileW", 0x3000),
        ("CreateFileA", 0x4000),
        ("NtClose", 0x5000),
    ])
}

#[test]
fn test_lifecycle()
{
    let backend = FakeBackend::new();
    let calls = backend.calls();
    let mut engine = SymbolEngine::new(backend, PROCESS);
    assert_eq!(engine.state(), SessionState::Uninitialized);
    assert_eq!(engine.process(), PROCESS);

    engine.initialize(Some(SYMBOL_PATH)).unwrap();
    assert_eq!(engine.state(), SessionState::Initialized);
    assert_eq!(engine.module_base(), None);

    let base = engine.load_module(IMAGE, Address::new(MODULE_BASE), MODULE_SIZE).unwrap();
    assert_eq!(base, Address::new(MODULE_BASE));
    assert_eq!(engine.state(), SessionState::ModuleLoaded);
    assert_eq!(engine.module_base(), Some(base));

    engine.cleanup();
    assert_eq!(engine.state(), SessionState::Uninitialized);
    assert_eq!(engine.module_base(), None);

    assert_eq!(
        calls.borrow().log,
        ["initialize", "set_options", "load_module", "module_info", "unload_module", "cleanup"]
    );
}

#[test]
fn test_initialize_never_invades_the_process()
{
    let backend = FakeBackend::new();
    let calls = backend.calls();
    let mut engine = SymbolEngine::new(backend, PROCESS);
    engine.initialize(Some(SYMBOL_PATH)).unwrap();

    assert_eq!(calls.borrow().invade_process, Some(false));
    assert_eq!(calls.borrow().search_path.as_deref(), Some(SYMBOL_PATH));
}

#[test]
fn test_initialize_without_path_uses_default()
{
    let backend = FakeBackend::new();
    let calls = backend.calls();
    let mut engine = SymbolEngine::new(backend, PROCESS);
    engine.initialize(Some("")).unwrap();

    let search_path = calls.borrow().search_path.clone().unwrap();
    assert!(search_path.ends_with("https://msdl.microsoft.com/download/symbols"));
}

#[test]
fn test_initialize_ors_session_options()
{
    let mut backend = FakeBackend::new();
    backend.options = SymOptions::from_bits_retain(0x0000_0004 | 0x0001_0000);
    let mut engine = SymbolEngine::new(backend, PROCESS);
    engine.initialize(Some(SYMBOL_PATH)).unwrap();

    let options = engine.backend().options;
    assert!(options.contains(SymOptions::SESSION));
    assert_eq!(options.bits(), 0x0000_0004 | 0x0001_0000 | SymOptions::SESSION.bits());
    assert_eq!(SymOptions::SESSION.bits(), 0x8000_2612);
}

#[test]
fn test_initialize_failure_keeps_session_uninitialized()
{
    let mut backend = FakeBackend::new();
    backend.init_error = Some(PlatformError(5));
    let calls = backend.calls();
    let mut engine = SymbolEngine::new(backend, PROCESS);

    let err = engine.initialize(Some(SYMBOL_PATH)).unwrap_err();
    assert!(matches!(err, PdbEnumError::BackendInit { code: PlatformError(5) }));
    assert_eq!(engine.state(), SessionState::Uninitialized);
    assert!(!calls.borrow().log.contains(&"set_options"));
}

#[test]
fn test_initialize_twice_is_rejected()
{
    let backend = FakeBackend::new();
    let calls = backend.calls();
    let mut engine = SymbolEngine::new(backend, PROCESS);
    engine.initialize(Some(SYMBOL_PATH)).unwrap();

    let err = engine.initialize(Some(SYMBOL_PATH)).unwrap_err();
    assert!(matches!(
        err,
        PdbEnumError::InvalidState {
            operation: "initialize",
            required: SessionState::Uninitialized,
            actual: SessionState::Initialized,
        }
    ));
    assert_eq!(calls.borrow().initialize, 1);
}

#[test]
fn test_load_module_before_initialize_is_rejected()
{
    let backend = FakeBackend::new();
    let calls = backend.calls();
    let mut engine = SymbolEngine::new(backend, PROCESS);

    let err = engine.load_module(IMAGE, Address::new(MODULE_BASE), MODULE_SIZE).unwrap_err();
    assert!(matches!(
        err,
        PdbEnumError::InvalidState {
            operation: "load_module",
            required: SessionState::Initialized,
            actual: SessionState::Uninitialized,
        }
    ));
    assert!(calls.borrow().log.is_empty());
}

#[test]
fn test_searches_before_load_are_rejected()
{
    let backend = file_apis();
    let calls = backend.calls();
    let mut engine = SymbolEngine::new(backend, PROCESS);
    engine.initialize(Some(SYMBOL_PATH)).unwrap();

    assert!(matches!(
        engine.find_symbol("CreateFile"),
        Err(PdbEnumError::InvalidState {
            required: SessionState::ModuleLoaded,
            ..
        })
    ));
    assert!(engine.find_symbols(&["CreateFile"]).is_err());
    assert!(engine.resolve_addresses(&[Address::new(0x1000)]).is_err());
    assert!(engine.symbols(None).is_err());
    assert!(engine.debug_info().is_err());
    assert_eq!(calls.borrow().enumerate, 0);
    assert_eq!(calls.borrow().module_info, 0);
}

#[test]
fn test_load_module_recovers_already_loaded_module()
{
    let mut backend = FakeBackend::new();
    backend.load = LoadBehavior::Fails(PlatformError(0));
    backend.registered_base = Some(Address::new(MODULE_BASE));
    let calls = backend.calls();
    let mut engine = SymbolEngine::new(backend, PROCESS);
    engine.initialize(Some(SYMBOL_PATH)).unwrap();

    let base = engine.load_module(IMAGE, Address::new(MODULE_BASE), MODULE_SIZE).unwrap();
    assert_eq!(base, Address::new(MODULE_BASE));
    assert_eq!(engine.state(), SessionState::ModuleLoaded);
    assert_eq!(calls.borrow().module_base, 1);
}

#[test]
fn test_load_module_recovers_from_zero_base()
{
    let mut backend = FakeBackend::new();
    backend.load = LoadBehavior::Returns(Address::ZERO);
    backend.registered_base = Some(Address::new(MODULE_BASE));
    let mut engine = SymbolEngine::new(backend, PROCESS);
    engine.initialize(Some(SYMBOL_PATH)).unwrap();

    let base = engine.load_module(IMAGE, Address::new(MODULE_BASE), MODULE_SIZE).unwrap();
    assert_eq!(base, Address::new(MODULE_BASE));
}

#[test]
fn test_load_module_already_loaded_but_not_registered()
{
    let mut backend = FakeBackend::new();
    backend.load = LoadBehavior::Fails(PlatformError(0));
    backend.registered_base = None;
    let mut engine = SymbolEngine::new(backend, PROCESS);
    engine.initialize(Some(SYMBOL_PATH)).unwrap();

    let err = engine.load_module(IMAGE, Address::new(MODULE_BASE), MODULE_SIZE).unwrap_err();
    assert!(matches!(err, PdbEnumError::ModuleNotRegistered { base } if base == Address::new(MODULE_BASE)));
    assert_eq!(engine.state(), SessionState::Initialized);
}

#[test]
fn test_load_module_hard_failure_carries_code()
{
    let mut backend = FakeBackend::new();
    backend.load = LoadBehavior::Fails(PlatformError::FILE_NOT_FOUND);
    backend.registered_base = Some(Address::new(MODULE_BASE));
    let calls = backend.calls();
    let mut engine = SymbolEngine::new(backend, PROCESS);
    engine.initialize(Some(SYMBOL_PATH)).unwrap();

    let err = engine.load_module(IMAGE, Address::new(MODULE_BASE), MODULE_SIZE).unwrap_err();
    match err {
        PdbEnumError::LoadModuleFailed { path, code } => {
            assert_eq!(path, IMAGE);
            assert_eq!(code.code(), 2);
        }
        other => panic!("Expected LoadModuleFailed, got {other:?}"),
    }
    // A nonzero code is never treated as "already loaded"
    assert_eq!(calls.borrow().module_base, 0);
    assert_eq!(engine.state(), SessionState::Initialized);
}

#[test]
fn test_load_module_with_exports_only_succeeds()
{
    let mut backend = FakeBackend::new();
    backend.info = Ok(export_info());
    let engine = loaded(backend);

    let info = engine.debug_info().unwrap();
    assert_eq!(info.symbol_kind, SymbolKind::Export);
    assert!(info.guid.is_nil());
    assert_eq!(engine.state(), SessionState::ModuleLoaded);
}

#[test]
fn test_load_module_survives_failing_info_query()
{
    let mut backend = FakeBackend::new();
    backend.info = Err(PlatformError(1));
    let engine = loaded(backend);
    assert_eq!(engine.state(), SessionState::ModuleLoaded);
}

#[test]
fn test_load_module_again_replaces_module()
{
    let mut engine = loaded(FakeBackend::new());
    let base = engine.load_module(IMAGE, Address::new(0x1_0000_0000), 0x1000).unwrap();
    assert_eq!(engine.module_base(), Some(base));
    assert_eq!(base, Address::new(0x1_0000_0000));
}

#[test]
fn test_debug_info()
{
    let engine = loaded(FakeBackend::new());
    let info = engine.debug_info().unwrap();

    assert_eq!(info.guid, pdb_guid());
    assert_eq!(info.age, 1);
    assert!(info.file_name.ends_with("ntdll.pdb"));
    assert_eq!(info.symbol_kind, SymbolKind::Pdb);
    assert_eq!(info.effective_kind(), SymbolKind::Pdb);
}

#[test]
fn test_debug_info_failure()
{
    let mut backend = FakeBackend::new();
    backend.info = Err(PlatformError(126));
    let engine = loaded(backend);

    let err = engine.debug_info().unwrap_err();
    assert!(matches!(
        err,
        PdbEnumError::BackendQueryFailed {
            operation: "SymGetModuleInfo64",
            code: PlatformError(126),
        }
    ));
}

#[test]
fn test_find_symbol_is_case_insensitive_substring()
{
    let engine = loaded(file_apis());

    let symbol = engine.find_symbol("createfilew").unwrap().unwrap();
    assert_eq!(symbol.name, "CreateFileW");
    assert_eq!(symbol.address, Address::new(0x3000));
    assert_eq!(symbol.size, 0x40);
}

#[test]
fn test_find_symbol_returns_first_in_enumeration_order()
{
    let backend = file_apis();
    let calls = backend.calls();
    let engine = loaded(backend);

    // "NtCreateFile" comes before "CreateFileW" in enumeration order
    let symbol = engine.find_symbol("CreateFile").unwrap().unwrap();
    assert_eq!(symbol.name, "NtCreateFile");
    assert_eq!(calls.borrow().visited, 2);
    assert_eq!(calls.borrow().masks, ["*"]);
}

#[test]
fn test_find_symbol_not_found()
{
    let backend = file_apis();
    let calls = backend.calls();
    let engine = loaded(backend);

    assert_eq!(engine.find_symbol("NoSuchSymbol").unwrap(), None);
    assert_eq!(calls.borrow().visited, 5);
}

#[test]
fn test_find_symbol_in_empty_module()
{
    let engine = loaded(FakeBackend::new());
    assert_eq!(engine.find_symbol("anything").unwrap(), None);
}

#[test]
fn test_find_symbol_enumeration_failure_is_not_found()
{
    let mut backend = file_apis();
    backend.enum_fails_after = Some(2);
    let engine = loaded(backend);

    assert_eq!(engine.find_symbol("NtClose").unwrap(), None);
    assert_eq!(engine.find_symbol("RtlInit").unwrap().unwrap().name, "RtlInitUnicodeString");
}

#[test]
fn test_find_symbols_matches_single_searches()
{
    let backend = file_apis();
    let calls = backend.calls();
    let engine = loaded(backend);

    let terms = ["createfile", "NtClose", "missing", "Rtl", "FileA"];
    let batch = engine.find_symbols(&terms).unwrap();
    assert_eq!(calls.borrow().enumerate, 1);

    let single: Vec<_> = terms.iter().map(|term| engine.find_symbol(term).unwrap()).collect();
    assert_eq!(batch, single);
    assert_eq!(batch[0].as_ref().unwrap().name, "NtCreateFile");
    assert!(batch[2].is_none());
}

#[test]
fn test_find_symbols_stops_when_all_found()
{
    let backend = file_apis();
    let calls = backend.calls();
    let engine = loaded(backend);

    let found = engine.find_symbols(&["Rtl", "NtCreate"]).unwrap();
    assert!(found.iter().all(Option::is_some));
    assert_eq!(calls.borrow().visited, 2);
}

#[test]
fn test_find_symbols_empty_list()
{
    let backend = file_apis();
    let calls = backend.calls();
    let engine = loaded(backend);

    let found = engine.find_symbols::<&str>(&[]).unwrap();
    assert!(found.is_empty());
    assert_eq!(calls.borrow().enumerate, 0);
}

#[test]
fn test_resolve_addresses_in_one_pass()
{
    let backend = file_apis();
    let calls = backend.calls();
    let engine = loaded(backend);

    let addresses = [
        Address::new(0x2000),
        Address::new(0x2000),
        Address::new(0x4000),
        Address::new(0x9999),
    ];
    let records = engine.resolve_addresses(&addresses).unwrap();

    assert_eq!(records.len(), 4);
    assert_eq!(records[0].name, "NtCreateFile");
    assert_eq!(records[0], records[1]);
    assert_eq!(records[2].name, "CreateFileA");
    assert!(records[3].is_placeholder());
    assert_eq!(records[3].address, Address::new(0x9999));
    assert_eq!(calls.borrow().enumerate, 1);
}

#[test]
fn test_resolve_addresses_cost_does_not_grow_with_request()
{
    let backend = file_apis();
    let calls = backend.calls();
    let engine = loaded(backend);

    let addresses = vec![Address::new(0x7777); 500];
    let records = engine.resolve_addresses(&addresses).unwrap();

    assert!(records.iter().all(|record| record.is_placeholder()));
    assert_eq!(calls.borrow().enumerate, 1);
    assert_eq!(calls.borrow().visited, 5);
}

#[test]
fn test_resolve_addresses_stops_once_resolved()
{
    let backend = file_apis();
    let calls = backend.calls();
    let engine = loaded(backend);

    engine
        .resolve_addresses(&[Address::new(0x2000), Address::new(0x1000)])
        .unwrap();
    assert_eq!(calls.borrow().visited, 2);
}

#[test]
fn test_resolve_addresses_first_symbol_at_address_wins()
{
    let engine = loaded(FakeBackend::new().with_symbols(&[("Alias", 0x1000), ("Original", 0x1000)]));

    let records = engine.resolve_addresses(&[Address::new(0x1000)]).unwrap();
    assert_eq!(records[0].name, "Alias");
}

#[test]
fn test_resolve_addresses_skips_unnamed_symbols()
{
    let engine = loaded(FakeBackend::new().with_symbols(&[("", 0x1000), ("Real", 0x1000)]));

    let records = engine.resolve_addresses(&[Address::new(0x1000)]).unwrap();
    assert_eq!(records[0].name, "Real");
    assert!(!records[0].is_placeholder());
}

#[test]
fn test_resolve_addresses_unnamed_only_stays_placeholder()
{
    let engine = loaded(FakeBackend::new().with_symbols(&[("", 0x1000)]));

    let records = engine.resolve_addresses(&[Address::new(0x1000)]).unwrap();
    assert!(records[0].is_placeholder());
    assert_eq!(records[0].address, Address::new(0x1000));
}

#[test]
fn test_resolve_addresses_empty_list()
{
    let backend = file_apis();
    let calls = backend.calls();
    let engine = loaded(backend);

    assert!(engine.resolve_addresses(&[]).unwrap().is_empty());
    assert_eq!(calls.borrow().enumerate, 0);
}

#[test]
fn test_symbols_lists_everything_in_order()
{
    let engine = loaded(file_apis());

    let names: Vec<_> = engine.symbols(None).unwrap().into_iter().map(|symbol| symbol.name).collect();
    assert_eq!(
        names,
        ["RtlInitUnicodeString", "NtCreateFile", "CreateFileW", "CreateFileA", "NtClose"]
    );
}

#[test]
fn test_symbols_with_mask()
{
    let backend = file_apis();
    let calls = backend.calls();
    let engine = loaded(backend);

    let symbols = engine.symbols(Some("Nt*")).unwrap();
    assert_eq!(symbols.len(), 2);
    assert_eq!(calls.borrow().masks, ["Nt*"]);
}

#[test]
fn test_symbols_enumeration_failure_keeps_partial_list()
{
    let mut backend = file_apis();
    backend.enum_fails_after = Some(3);
    let engine = loaded(backend);

    assert_eq!(engine.symbols(None).unwrap().len(), 3);
}

#[test]
fn test_cleanup_is_idempotent()
{
    let backend = FakeBackend::new();
    let calls = backend.calls();
    let mut engine = SymbolEngine::new(backend, PROCESS);

    engine.cleanup();
    engine.cleanup();
    assert_eq!(engine.state(), SessionState::Uninitialized);
    assert_eq!(calls.borrow().unload, 0);

    engine.initialize(Some(SYMBOL_PATH)).unwrap();
    engine.cleanup();
    engine.cleanup();
    assert_eq!(engine.state(), SessionState::Uninitialized);
}

#[test]
fn test_cleanup_failure_still_resets()
{
    let mut backend = FakeBackend::new();
    backend.cleanup_error = Some(PlatformError(6));
    let mut engine = loaded(backend);

    engine.cleanup();
    assert_eq!(engine.state(), SessionState::Uninitialized);
}

#[test]
fn test_reinitialize_after_cleanup()
{
    let backend = FakeBackend::new();
    let calls = backend.calls();
    let mut engine = loaded(backend);
    engine.cleanup();

    engine.initialize(Some(SYMBOL_PATH)).unwrap();
    engine.load_module(IMAGE, Address::new(MODULE_BASE), MODULE_SIZE).unwrap();
    assert_eq!(engine.state(), SessionState::ModuleLoaded);
    assert_eq!(calls.borrow().initialize, 2);
}

#[test]
fn test_drop_cleans_up_live_session()
{
    let backend = FakeBackend::new();
    let calls = backend.calls();
    drop(loaded(backend));

    assert_eq!(calls.borrow().unload, 1);
    assert_eq!(calls.borrow().cleanup, 1);
}

#[test]
fn test_drop_after_cleanup_does_nothing()
{
    let backend = FakeBackend::new();
    let calls = backend.calls();
    let mut engine = loaded(backend);
    engine.cleanup();
    drop(engine);

    assert_eq!(calls.borrow().cleanup, 1);

    let untouched = FakeBackend::new();
    let untouched_calls = untouched.calls();
    drop(SymbolEngine::new(untouched, PROCESS));
    assert!(untouched_calls.borrow().log.is_empty());
}
