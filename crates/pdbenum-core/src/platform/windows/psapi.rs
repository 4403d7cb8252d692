//! Module discovery with the process status API.

use std::ffi::c_void;
use std::mem;
use std::ptr;

use tracing::debug;
use windows_sys::Win32::Foundation::HMODULE;
use windows_sys::Win32::System::ProcessStatus::{
    K32EnumProcessModules, K32GetModuleFileNameExW, K32GetModuleInformation, MODULEINFO,
};

use super::ffi::{self, RawHandle};
use crate::error::{PdbEnumError, PdbEnumResult};
use crate::locator::{file_name, module_name_matches, ModuleLocator};
use crate::types::{Address, ModuleDescriptor, ProcessHandle};

/// Initial capacity of the module handle buffer
const INITIAL_MODULE_CAPACITY: usize = 1024;

/// Longest module path we read, in UTF-16 units
const MAX_MODULE_PATH: usize = 1024;

/// [`ModuleLocator`] backed by `EnumProcessModules`
///
/// Needs a handle opened with `PROCESS_QUERY_INFORMATION | PROCESS_VM_READ`.
/// A 64-bit caller only sees the 64-bit modules of a WOW64 target.
#[derive(Debug, Clone, Copy, Default)]
pub struct PsapiModuleLocator;

impl ModuleLocator for PsapiModuleLocator
{
    fn find_module(&self, process: ProcessHandle, name: &str) -> PdbEnumResult<Option<ModuleDescriptor>>
    {
        let handle = process.raw() as RawHandle;
        for module in module_handles(handle)? {
            let Some(path) = module_path(handle, module) else {
                continue;
            };
            if !module_name_matches(&path, name) {
                continue;
            }
            match module_information(handle, module) {
                Some(info) => return Ok(Some(descriptor(path, &info))),
                None => debug!("GetModuleInformation failed for {path}: {}", ffi::last_error()),
            }
        }
        Ok(None)
    }
}

fn module_handles(handle: RawHandle) -> PdbEnumResult<Vec<HMODULE>>
{
    let mut modules: Vec<HMODULE> = vec![ptr::null_mut(); INITIAL_MODULE_CAPACITY];
    loop {
        let capacity = (modules.len() * mem::size_of::<HMODULE>()) as u32;
        let mut needed = 0u32;
        // SAFETY: `modules` holds `capacity` writable bytes.
        let ok = unsafe { K32EnumProcessModules(handle, modules.as_mut_ptr(), capacity, &mut needed) };
        if ok == 0 {
            return Err(PdbEnumError::EnumerationFailed {
                code: ffi::last_error(),
            });
        }

        let count = needed as usize / mem::size_of::<HMODULE>();
        if needed <= capacity {
            modules.truncate(count);
            debug!("Process has {count} modules loaded");
            return Ok(modules);
        }
        // More modules were loaded than fit; grow and ask again.
        modules.resize(count, ptr::null_mut());
    }
}

fn module_path(handle: RawHandle, module: HMODULE) -> Option<String>
{
    let mut buffer = [0u16; MAX_MODULE_PATH];
    // SAFETY: `buffer` holds MAX_MODULE_PATH writable UTF-16 units.
    let len = unsafe { K32GetModuleFileNameExW(handle, module, buffer.as_mut_ptr(), buffer.len() as u32) };
    (len != 0).then(|| String::from_utf16_lossy(&buffer[..len as usize]))
}

fn module_information(handle: RawHandle, module: HMODULE) -> Option<MODULEINFO>
{
    let mut info = MODULEINFO {
        lpBaseOfDll: ptr::null_mut(),
        SizeOfImage: 0,
        EntryPoint: ptr::null_mut(),
    };
    // SAFETY: `info` is a writable MODULEINFO of the size passed.
    let ok = unsafe { K32GetModuleInformation(handle, module, &mut info, mem::size_of::<MODULEINFO>() as u32) };
    (ok != 0).then_some(info)
}

fn descriptor(full_path: String, info: &MODULEINFO) -> ModuleDescriptor
{
    ModuleDescriptor {
        name: file_name(&full_path).to_string(),
        base_address: pointer_address(info.lpBaseOfDll),
        size: info.SizeOfImage,
        entry_point: pointer_address(info.EntryPoint),
        full_path,
    }
}

fn pointer_address(pointer: *mut c_void) -> Address
{
    Address::new(pointer as usize as u64)
}
