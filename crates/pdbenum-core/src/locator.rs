//! # Module Locator Capability
//!
//! Finds a named module among the modules a process has loaded. The Windows
//! implementation is [`PsapiModuleLocator`](crate::platform::windows::PsapiModuleLocator).

use crate::error::PdbEnumResult;
use crate::types::{ModuleDescriptor, ProcessHandle};

/// Looks up loaded modules in a process
pub trait ModuleLocator
{
    /// Find the module whose file name equals `name`, ignoring case
    ///
    /// Returns `Ok(None)` when the process has no such module.
    ///
    /// ## Errors
    ///
    /// - `EnumerationFailed`: the process's module list could not be read at all
    fn find_module(&self, process: ProcessHandle, name: &str) -> PdbEnumResult<Option<ModuleDescriptor>>;
}

/// File-name component of a Windows or POSIX path.
pub fn file_name(path: &str) -> &str
{
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Whether the module at `full_path` is the module called `name`
///
/// Exact file-name comparison, case-insensitive. Directories in `full_path`
/// are ignored; `name` is never matched as a prefix or substring.
///
/// ```rust
/// use pdbenum_core::locator::module_name_matches;
///
/// assert!(module_name_matches(r"C:\Windows\System32\KERNEL32.DLL", "kernel32.dll"));
/// assert!(!module_name_matches(r"C:\Windows\System32\kernel32.dll", "kernel32"));
/// ```
pub fn module_name_matches(full_path: &str, name: &str) -> bool
{
    let candidate = file_name(full_path);
    candidate.eq_ignore_ascii_case(name) || candidate.to_lowercase() == name.to_lowercase()
}
