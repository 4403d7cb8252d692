//! Scriptable in-memory backend and locator shared by the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use pdbenum_core::backend::{BackendModuleInfo, PlatformError, SymOptions, SymbolBackend, SymbolView, SymbolVisitor};
use pdbenum_core::error::{PdbEnumError, PdbEnumResult};
use pdbenum_core::locator::{module_name_matches, ModuleLocator};
use pdbenum_core::types::{Address, ModuleDescriptor, ProcessHandle, SymbolKind};
use uuid::Uuid;

pub const PROCESS: ProcessHandle = ProcessHandle::from_raw(0x1234);
pub const MODULE_BASE: u64 = 0x7FF8_1000_0000;
pub const MODULE_SIZE: u32 = 0x0020_0000;
pub const SYMBOL_PATH: &str = r"SRV*C:\symbols*https://msdl.microsoft.com/download/symbols";

/// What the fake backend saw, shared with the test after the backend is moved away
#[derive(Debug, Default)]
pub struct Calls
{
    pub initialize: usize,
    pub load_module: usize,
    pub module_base: usize,
    pub module_info: usize,
    pub enumerate: usize,
    pub unload: usize,
    pub cleanup: usize,
    /// Symbols handed to a visitor, over all enumerations
    pub visited: usize,
    pub search_path: Option<String>,
    pub invade_process: Option<bool>,
    pub masks: Vec<String>,
    /// Backend calls in order
    pub log: Vec<&'static str>,
}

/// How `load_module` answers
#[derive(Debug, Clone, Copy)]
pub enum LoadBehavior
{
    /// Succeed at the requested base
    Echo,
    /// Succeed at a fixed base (possibly zero)
    Returns(Address),
    /// Fail with a platform error code (zero means "already loaded")
    Fails(PlatformError),
}

#[derive(Debug, Clone)]
pub struct FakeBackend
{
    pub calls: Rc<RefCell<Calls>>,
    pub symbols: Vec<(String, u64, u32)>,
    pub options: SymOptions,
    pub init_error: Option<PlatformError>,
    pub load: LoadBehavior,
    pub registered_base: Option<Address>,
    pub info: Result<BackendModuleInfo, PlatformError>,
    /// Fail the enumeration once this many symbols were visited (or at the end)
    pub enum_fails_after: Option<usize>,
    pub cleanup_error: Option<PlatformError>,
}

impl FakeBackend
{
    pub fn new() -> Self
    {
        Self {
            calls: Rc::default(),
            symbols: Vec::new(),
            options: SymOptions::empty(),
            init_error: None,
            load: LoadBehavior::Echo,
            registered_base: None,
            info: Ok(pdb_info()),
            enum_fails_after: None,
            cleanup_error: None,
        }
    }

    pub fn with_symbols(mut self, symbols: &[(&str, u64)]) -> Self
    {
        self.symbols = symbols
            .iter()
            .map(|(name, address)| ((*name).to_string(), *address, 0x40))
            .collect();
        self
    }

    pub fn calls(&self) -> Rc<RefCell<Calls>>
    {
        Rc::clone(&self.calls)
    }

    fn record(&self, call: &'static str)
    {
        self.calls.borrow_mut().log.push(call);
    }
}

impl SymbolBackend for FakeBackend
{
    fn initialize(&mut self, _process: ProcessHandle, search_path: &str, invade_process: bool)
        -> Result<(), PlatformError>
    {
        self.record("initialize");
        let mut calls = self.calls.borrow_mut();
        calls.initialize += 1;
        calls.search_path = Some(search_path.to_string());
        calls.invade_process = Some(invade_process);
        self.init_error.map_or(Ok(()), Err)
    }

    fn options(&self) -> SymOptions
    {
        self.options
    }

    fn set_options(&mut self, options: SymOptions) -> SymOptions
    {
        self.record("set_options");
        self.options = options;
        self.options
    }

    fn load_module(&mut self, _process: ProcessHandle, _image_path: &str, base: Address, _size: u32)
        -> Result<Address, PlatformError>
    {
        self.record("load_module");
        self.calls.borrow_mut().load_module += 1;
        match self.load {
            LoadBehavior::Echo => Ok(base),
            LoadBehavior::Returns(address) => Ok(address),
            LoadBehavior::Fails(code) => Err(code),
        }
    }

    fn module_base(&self, _process: ProcessHandle, _address: Address) -> Option<Address>
    {
        self.record("module_base");
        self.calls.borrow_mut().module_base += 1;
        self.registered_base
    }

    fn module_info(&self, _process: ProcessHandle, _base: Address) -> Result<BackendModuleInfo, PlatformError>
    {
        self.record("module_info");
        self.calls.borrow_mut().module_info += 1;
        self.info.clone()
    }

    fn enumerate_symbols(
        &self,
        _process: ProcessHandle,
        _base: Address,
        mask: &str,
        visitor: &mut SymbolVisitor<'_>,
    ) -> Result<(), PlatformError>
    {
        self.record("enumerate_symbols");
        {
            let mut calls = self.calls.borrow_mut();
            calls.enumerate += 1;
            calls.masks.push(mask.to_string());
        }

        let matching = self.symbols.iter().filter(|(name, ..)| wildcard_match(mask, name));
        for (visited, (name, address, size)) in matching.enumerate() {
            if self.enum_fails_after == Some(visited) {
                return Err(PlatformError(87));
            }
            self.calls.borrow_mut().visited += 1;
            let view = SymbolView {
                name,
                address: Address::new(*address),
                size: *size,
                flags: 0x200,
                tag: 5,
            };
            if visitor(view).is_break() {
                return Ok(());
            }
        }
        self.enum_fails_after.map_or(Ok(()), |_| Err(PlatformError(87)))
    }

    fn unload_module(&mut self, _process: ProcessHandle, _base: Address) -> Result<(), PlatformError>
    {
        self.record("unload_module");
        self.calls.borrow_mut().unload += 1;
        Ok(())
    }

    fn cleanup(&mut self, _process: ProcessHandle) -> Result<(), PlatformError>
    {
        self.record("cleanup");
        self.calls.borrow_mut().cleanup += 1;
        self.cleanup_error.map_or(Ok(()), Err)
    }
}

/// Case-insensitive `*`/`?` matching, like the backend's symbol masks
pub fn wildcard_match(mask: &str, name: &str) -> bool
{
    fn matches(mask: &[char], name: &[char]) -> bool
    {
        match (mask.first(), name.first()) {
            (None, None) => true,
            (Some('*'), _) => matches(&mask[1..], name) || (!name.is_empty() && matches(mask, &name[1..])),
            (Some('?'), Some(_)) => matches(&mask[1..], &name[1..]),
            (Some(m), Some(n)) => m.eq_ignore_ascii_case(n) && matches(&mask[1..], &name[1..]),
            _ => false,
        }
    }
    let mask: Vec<char> = mask.chars().collect();
    let name: Vec<char> = name.chars().collect();
    matches(&mask, &name)
}

pub fn pdb_guid() -> Uuid
{
    Uuid::parse_str("1b2c3d4e-5f60-4a7b-8c9d-0e1f2a3b4c5d").unwrap()
}

/// Module info for a module whose PDB was found
pub fn pdb_info() -> BackendModuleInfo
{
    BackendModuleInfo {
        base_address: Address::new(MODULE_BASE),
        image_size: MODULE_SIZE,
        symbol_kind: SymbolKind::Pdb,
        loaded_image_name: r"C:\Windows\System32\ntdll.dll".to_string(),
        loaded_pdb_name: r"C:\symbols\ntdll.pdb\1B2C3D4E5F604A7B8C9D0E1F2A3B4C5D1\ntdll.pdb".to_string(),
        pdb_guid: pdb_guid(),
        pdb_age: 1,
    }
}

/// Module info for a module with exports only
pub fn export_info() -> BackendModuleInfo
{
    BackendModuleInfo {
        symbol_kind: SymbolKind::Export,
        loaded_pdb_name: String::new(),
        pdb_guid: Uuid::nil(),
        pdb_age: 0,
        ..pdb_info()
    }
}

pub fn ntdll() -> ModuleDescriptor
{
    ModuleDescriptor {
        name: "ntdll.dll".to_string(),
        full_path: r"C:\Windows\System32\ntdll.dll".to_string(),
        base_address: Address::new(MODULE_BASE),
        size: MODULE_SIZE,
        entry_point: Address::ZERO,
    }
}

pub fn kernel32() -> ModuleDescriptor
{
    ModuleDescriptor {
        name: "KERNEL32.DLL".to_string(),
        full_path: r"C:\Windows\System32\KERNEL32.DLL".to_string(),
        base_address: Address::new(0x7FF8_2000_0000),
        size: 0x000C_0000,
        entry_point: Address::new(0x7FF8_2001_5000),
    }
}

/// Locator over a fixed module list
#[derive(Debug, Clone, Default)]
pub struct FakeLocator
{
    pub modules: Vec<ModuleDescriptor>,
    pub error: Option<PlatformError>,
}

impl FakeLocator
{
    pub fn with(modules: Vec<ModuleDescriptor>) -> Self
    {
        Self { modules, error: None }
    }
}

impl ModuleLocator for FakeLocator
{
    fn find_module(&self, _process: ProcessHandle, name: &str) -> PdbEnumResult<Option<ModuleDescriptor>>
    {
        if let Some(code) = self.error {
            return Err(PdbEnumError::EnumerationFailed { code });
        }
        Ok(self
            .modules
            .iter()
            .find(|module| module_name_matches(&module.full_path, name))
            .cloned())
    }
}
