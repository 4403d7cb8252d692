//! # Owned Process Handle
//!
//! RAII wrapper around `OpenProcess`/`CloseHandle`.
//!
//! The engine and the backends only ever *borrow* a process handle (see
//! [`ProcessHandle`]). [`OwnedProcess`] is what actually owns it: the handle
//! is closed exactly once, when the owner is dropped, even if a lookup fails
//! half-way through.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pdbenum_core::platform::windows::OwnedProcess;
//! use pdbenum_core::types::ProcessId;
//!
//! let process = OwnedProcess::open(ProcessId(1234))?;
//! println!("opened {} as {}", process.pid(), process.handle());
//! // Handle is closed here
//! # Ok::<(), pdbenum_core::error::PdbEnumError>(())
//! ```

use tracing::debug;
use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
use windows_sys::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};

use super::ffi;
use crate::error::{PdbEnumError, PdbEnumResult};
use crate::types::{ProcessHandle, ProcessId};

/// A process opened for module enumeration and symbol loading
pub struct OwnedProcess
{
    handle: HANDLE,
    pid: ProcessId,
}

impl OwnedProcess
{
    /// Open `pid` with `PROCESS_QUERY_INFORMATION | PROCESS_VM_READ`
    ///
    /// ## Errors
    ///
    /// - `ProcessOpenFailed`: the process doesn't exist or access was denied
    pub fn open(pid: ProcessId) -> PdbEnumResult<Self>
    {
        // SAFETY: plain integer arguments; the result is checked for null.
        let handle = unsafe { OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, 0, pid.0) };
        if handle.is_null() {
            return Err(PdbEnumError::ProcessOpenFailed {
                pid: pid.0,
                code: ffi::last_error(),
            });
        }
        debug!("Opened process {pid}");
        Ok(Self { handle, pid })
    }

    /// Borrowed handle for the engine and locator
    pub fn handle(&self) -> ProcessHandle
    {
        ProcessHandle::from_raw(self.handle as usize)
    }

    /// PID this handle was opened for
    pub fn pid(&self) -> ProcessId
    {
        self.pid
    }
}

impl Drop for OwnedProcess
{
    fn drop(&mut self)
    {
        // SAFETY: the handle came from OpenProcess and is closed only here.
        if unsafe { CloseHandle(self.handle) } == 0 {
            debug!("CloseHandle failed for process {}: {}", self.pid, ffi::last_error());
        }
    }
}
