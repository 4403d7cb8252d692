//! # DbgHelp Symbol Backend
//!
//! [`DbgHelp`] implements [`SymbolBackend`] on top of `dbghelp.dll`.
//!
//! The library is loaded once per process from an explicit path and never
//! unloaded: dbghelp keeps global state (sessions keyed by process handle,
//! downloaded PDB mappings), so there is nothing to gain from freeing it and
//! loading two copies side by side would split that state.
//!
//! ## Why a private copy?
//!
//! The `dbghelp.dll` in `System32` ships without `symsrv.dll`, so it can't
//! download PDBs from a symbol server. The tool therefore carries its own copy
//! (with `symsrv.dll` beside it) under `runtimes/win-x64` or `runtimes/win-x86`
//! and loads it with `LOAD_WITH_ALTERED_SEARCH_PATH`, which makes the loader
//! resolve `symsrv.dll` from the same directory.

use std::ffi::{c_void, CString};
use std::ops::ControlFlow;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::ptr;

use once_cell::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryExW, LOAD_WITH_ALTERED_SEARCH_PATH};

use super::ffi::{self, Bool, ImagehlpModule64, RawHandle, SymbolInfo, FALSE, TRUE};
use crate::backend::{BackendModuleInfo, PlatformError, SymOptions, SymbolBackend, SymbolView, SymbolVisitor};
use crate::error::{PdbEnumError, PdbEnumResult};
use crate::types::{Address, ProcessHandle, SymbolKind};

/// Entry points resolved from the loaded library
struct Api
{
    initialize: ffi::SymInitializeFn,
    get_options: ffi::SymGetOptionsFn,
    set_options: ffi::SymSetOptionsFn,
    load_module_ex: ffi::SymLoadModuleExFn,
    get_module_base64: ffi::SymGetModuleBase64Fn,
    get_module_info64: ffi::SymGetModuleInfo64Fn,
    enum_symbols: ffi::SymEnumSymbolsFn,
    unload_module64: ffi::SymUnloadModule64Fn,
    cleanup: ffi::SymCleanupFn,
}

static API: OnceCell<Api> = OnceCell::new();

/// `dbghelp.dll` as a [`SymbolBackend`]
///
/// Cheap to construct once the library is loaded; every instance shares the
/// same entry points. Sessions are keyed by the process handle, so one
/// `DbgHelp` can serve any number of engines as long as their handles differ.
#[derive(Clone, Copy)]
pub struct DbgHelp
{
    api: &'static Api,
}

impl DbgHelp
{
    /// Load `dbghelp.dll` from `path` and resolve its entry points
    ///
    /// Only the first successful call actually loads a library. Later calls
    /// reuse it, whatever path they are given.
    ///
    /// ## Errors
    ///
    /// - `BackendUnavailable`: the file doesn't exist, the loader rejected it,
    ///   or an entry point is missing
    pub fn load(path: &Path) -> PdbEnumResult<Self>
    {
        let api = API.get_or_try_init(|| {
            let unavailable = |code| PdbEnumError::BackendUnavailable {
                path: path.display().to_string(),
                code,
            };

            if !path.is_file() {
                return Err(unavailable(PlatformError::FILE_NOT_FOUND));
            }

            info!("Loading dbghelp.dll from: {}", path.display());
            // SAFETY: the library is never freed, so resolved pointers stay valid.
            unsafe { load_api(path) }.map_err(unavailable)
        })?;

        Ok(Self { api })
    }
}

unsafe fn load_api(path: &Path) -> Result<Api, PlatformError>
{
    let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();
    let module = LoadLibraryExW(wide.as_ptr(), ptr::null_mut(), LOAD_WITH_ALTERED_SEARCH_PATH);
    if module.is_null() {
        return Err(ffi::last_error());
    }

    macro_rules! resolve {
        ($name:literal) => {{
            let proc = GetProcAddress(module, concat!($name, "\0").as_ptr());
            match proc {
                // SAFETY: the signature is the one dbghelp.h declares for this name.
                Some(proc) => std::mem::transmute(proc),
                None => {
                    debug!("dbghelp.dll has no export named {}", $name);
                    return Err(ffi::last_error());
                }
            }
        }};
    }

    Ok(Api {
        initialize: resolve!("SymInitialize"),
        get_options: resolve!("SymGetOptions"),
        set_options: resolve!("SymSetOptions"),
        load_module_ex: resolve!("SymLoadModuleEx"),
        get_module_base64: resolve!("SymGetModuleBase64"),
        get_module_info64: resolve!("SymGetModuleInfo64"),
        enum_symbols: resolve!("SymEnumSymbols"),
        unload_module64: resolve!("SymUnloadModule64"),
        cleanup: resolve!("SymCleanup"),
    })
}

fn raw(process: ProcessHandle) -> RawHandle
{
    process.raw() as RawHandle
}

fn c_string(value: &str) -> Result<CString, PlatformError>
{
    CString::new(value).map_err(|_| ffi::ERROR_INVALID_PARAMETER)
}

fn check(result: Bool) -> Result<(), PlatformError>
{
    if result == FALSE {
        Err(ffi::last_error())
    } else {
        Ok(())
    }
}

struct EnumContext<'a, 'v>
{
    visitor: &'a mut SymbolVisitor<'v>,
    stopped: bool,
}

unsafe extern "system" fn enum_symbols_callback(info: *const SymbolInfo, _symbol_size: u32, context: *mut c_void) -> Bool
{
    if info.is_null() || context.is_null() {
        return TRUE;
    }
    // SAFETY: `context` is the `EnumContext` passed to SymEnumSymbols below and
    // outlives the call; `info` is valid for the duration of this callback.
    let context = &mut *context.cast::<EnumContext<'_, '_>>();
    let info = &*info;

    let name_bytes = std::slice::from_raw_parts(info.Name.as_ptr(), info.NameLen as usize);
    let name = String::from_utf8_lossy(name_bytes);

    let view = SymbolView {
        name: &name,
        address: Address::new(info.Address),
        size: info.Size,
        flags: info.Flags,
        tag: info.Tag,
    };
    match (context.visitor)(view) {
        ControlFlow::Continue(()) => TRUE,
        ControlFlow::Break(()) => {
            context.stopped = true;
            FALSE
        }
    }
}

impl SymbolBackend for DbgHelp
{
    fn initialize(&mut self, process: ProcessHandle, search_path: &str, invade_process: bool)
        -> Result<(), PlatformError>
    {
        let search_path = c_string(search_path)?;
        let invade = if invade_process { TRUE } else { FALSE };
        // SAFETY: valid handle value and NUL-terminated string.
        check(unsafe { (self.api.initialize)(raw(process), search_path.as_ptr(), invade) })
    }

    fn options(&self) -> SymOptions
    {
        // SAFETY: no arguments.
        SymOptions::from_bits_retain(unsafe { (self.api.get_options)() })
    }

    fn set_options(&mut self, options: SymOptions) -> SymOptions
    {
        // SAFETY: plain integer argument.
        SymOptions::from_bits_retain(unsafe { (self.api.set_options)(options.bits()) })
    }

    fn load_module(&mut self, process: ProcessHandle, image_path: &str, base: Address, size: u32)
        -> Result<Address, PlatformError>
    {
        let image = c_string(image_path)?;
        // SAFETY: optional pointers are null, strings are NUL-terminated.
        let loaded = unsafe {
            (self.api.load_module_ex)(
                raw(process),
                ptr::null_mut(),
                image.as_ptr(),
                ptr::null(),
                base.value(),
                size,
                ptr::null(),
                0,
            )
        };
        if loaded == 0 {
            return Err(ffi::last_error());
        }
        Ok(Address::new(loaded))
    }

    fn module_base(&self, process: ProcessHandle, address: Address) -> Option<Address>
    {
        // SAFETY: plain integer arguments.
        let base = unsafe { (self.api.get_module_base64)(raw(process), address.value()) };
        (base != 0).then(|| Address::new(base))
    }

    fn module_info(&self, process: ProcessHandle, base: Address) -> Result<BackendModuleInfo, PlatformError>
    {
        let mut module = ImagehlpModule64::new();
        // SAFETY: `module` is a properly sized, writable IMAGEHLP_MODULE64.
        check(unsafe { (self.api.get_module_info64)(raw(process), base.value(), &mut module) })?;

        let guid = module.PdbSig70;
        Ok(BackendModuleInfo {
            base_address: Address::new(module.BaseOfImage),
            image_size: module.ImageSize,
            symbol_kind: SymbolKind::from(module.SymType),
            loaded_image_name: ffi::fixed_str(&module.LoadedImageName),
            loaded_pdb_name: ffi::fixed_str(&module.LoadedPdbName),
            pdb_guid: Uuid::from_fields(guid.data1, guid.data2, guid.data3, &guid.data4),
            pdb_age: module.PdbAge,
        })
    }

    fn enumerate_symbols(
        &self,
        process: ProcessHandle,
        base: Address,
        mask: &str,
        visitor: &mut SymbolVisitor<'_>,
    ) -> Result<(), PlatformError>
    {
        let mask = c_string(mask)?;
        let mut context = EnumContext {
            visitor,
            stopped: false,
        };

        // SAFETY: `context` lives on this frame for the whole call and the
        // callback only reinterprets it as the same type.
        let result = unsafe {
            (self.api.enum_symbols)(
                raw(process),
                base.value(),
                mask.as_ptr(),
                enum_symbols_callback,
                (&mut context as *mut EnumContext<'_, '_>).cast(),
            )
        };

        // Stopping early from the callback can surface as a failure.
        if result == FALSE && !context.stopped {
            return Err(ffi::last_error());
        }
        Ok(())
    }

    fn unload_module(&mut self, process: ProcessHandle, base: Address) -> Result<(), PlatformError>
    {
        // SAFETY: plain integer arguments.
        check(unsafe { (self.api.unload_module64)(raw(process), base.value()) })
    }

    fn cleanup(&mut self, process: ProcessHandle) -> Result<(), PlatformError>
    {
        // SAFETY: plain handle argument.
        check(unsafe { (self.api.cleanup)(raw(process)) })
    }
}
