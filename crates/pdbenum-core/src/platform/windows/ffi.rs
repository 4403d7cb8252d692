//! # dbghelp FFI Declarations
//!
//! Structures and entry-point signatures for the `dbghelp.dll` calls the
//! backend makes. `windows-sys` declares these as static imports of the system
//! `dbghelp.dll`; we need them as function pointers into whichever copy was
//! loaded at runtime, so they are declared here.
//!
//! All strings are the ANSI variants (`SymInitialize`, not `SymInitializeW`),
//! so the structures carry `CHAR` arrays.
//!
//! ## Safety Notes
//!
//! The layouts must match `dbghelp.h` exactly. `IMAGEHLP_MODULE64` is
//! versioned by its `SizeOfStruct` field: passing the full size asks for every
//! field including the PDB signature and age.

#![allow(non_snake_case)]

use std::ffi::{c_char, c_void};

use crate::backend::PlatformError;

/// Win32 `BOOL`: zero is failure, anything else is success
pub type Bool = i32;

/// Raw `HANDLE` as dbghelp takes it
pub type RawHandle = *mut c_void;

pub const FALSE: Bool = 0;
pub const TRUE: Bool = 1;

/// `ERROR_INVALID_PARAMETER`, used for strings that can't cross the boundary
pub const ERROR_INVALID_PARAMETER: PlatformError = PlatformError(87);

/// Win32 `GUID`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Guid
{
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

/// `IMAGEHLP_MODULE64` (ANSI)
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ImagehlpModule64
{
    pub SizeOfStruct: u32,
    pub BaseOfImage: u64,
    pub ImageSize: u32,
    pub TimeDateStamp: u32,
    pub CheckSum: u32,
    pub NumSyms: u32,
    pub SymType: u32,
    pub ModuleName: [u8; 32],
    pub ImageName: [u8; 256],
    pub LoadedImageName: [u8; 256],
    pub LoadedPdbName: [u8; 256],
    pub CVSig: u32,
    pub CVData: [u8; 260 * 3],
    pub PdbSig: u32,
    pub PdbSig70: Guid,
    pub PdbAge: u32,
    pub PdbUnmatched: Bool,
    pub DbgUnmatched: Bool,
    pub LineNumbers: Bool,
    pub GlobalSymbols: Bool,
    pub TypeInfo: Bool,
    pub SourceIndexed: Bool,
    pub Publics: Bool,
    pub MachineType: u32,
    pub Reserved: u32,
}

impl ImagehlpModule64
{
    /// Zeroed structure with `SizeOfStruct` filled in, ready to pass to `SymGetModuleInfo64`
    pub fn new() -> Self
    {
        // SAFETY: every field is an integer or an integer array; all-zero is valid.
        let mut module: Self = unsafe { std::mem::zeroed() };
        module.SizeOfStruct = std::mem::size_of::<Self>() as u32;
        module
    }
}

/// `SYMBOL_INFO` (ANSI)
///
/// `Name` is a flexible array: the backend allocates `NameLen` bytes past it.
/// `NameLen` does not count the terminating NUL.
#[repr(C)]
pub struct SymbolInfo
{
    pub SizeOfStruct: u32,
    pub TypeIndex: u32,
    pub Reserved: [u64; 2],
    pub Index: u32,
    pub Size: u32,
    pub ModBase: u64,
    pub Flags: u32,
    pub Value: u64,
    pub Address: u64,
    pub Register: u32,
    pub Scope: u32,
    pub Tag: u32,
    pub NameLen: u32,
    pub MaxNameLen: u32,
    pub Name: [u8; 1],
}

/// `PSYM_ENUMERATESYMBOLS_CALLBACK`
pub type SymEnumSymbolsCallback =
    unsafe extern "system" fn(info: *const SymbolInfo, symbol_size: u32, context: *mut c_void) -> Bool;

pub type SymInitializeFn =
    unsafe extern "system" fn(process: RawHandle, search_path: *const c_char, invade_process: Bool) -> Bool;

pub type SymGetOptionsFn = unsafe extern "system" fn() -> u32;

pub type SymSetOptionsFn = unsafe extern "system" fn(options: u32) -> u32;

pub type SymLoadModuleExFn = unsafe extern "system" fn(
    process: RawHandle,
    file: RawHandle,
    image_name: *const c_char,
    module_name: *const c_char,
    base_of_dll: u64,
    dll_size: u32,
    data: *const c_void,
    flags: u32,
) -> u64;

pub type SymGetModuleBase64Fn = unsafe extern "system" fn(process: RawHandle, address: u64) -> u64;

pub type SymGetModuleInfo64Fn =
    unsafe extern "system" fn(process: RawHandle, address: u64, module_info: *mut ImagehlpModule64) -> Bool;

pub type SymEnumSymbolsFn = unsafe extern "system" fn(
    process: RawHandle,
    base_of_dll: u64,
    mask: *const c_char,
    callback: SymEnumSymbolsCallback,
    context: *mut c_void,
) -> Bool;

pub type SymUnloadModule64Fn = unsafe extern "system" fn(process: RawHandle, base_of_dll: u64) -> Bool;

pub type SymCleanupFn = unsafe extern "system" fn(process: RawHandle) -> Bool;

/// `GetLastError()` as a [`PlatformError`]
///
/// Must be called immediately after the failing call, before anything else
/// can overwrite the thread's last-error value.
pub fn last_error() -> PlatformError
{
    // SAFETY: GetLastError only reads thread-local state.
    PlatformError(unsafe { windows_sys::Win32::Foundation::GetLastError() })
}

/// Text up to the first NUL of a fixed-size `CHAR` array
pub fn fixed_str(bytes: &[u8]) -> String
{
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).into_owned()
}
