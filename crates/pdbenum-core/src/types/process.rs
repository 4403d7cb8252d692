//! Process identity types.

use std::fmt;

/// Process ID (PID)
///
/// A process ID is a unique identifier assigned by the operating system to each
/// running process. Only used to open a process and to label errors; the symbol
/// backend itself is keyed by [`ProcessHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId
{
    fn from(pid: u32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to an opened process
///
/// This is the raw OS handle value (a `HANDLE` on Windows). It is **borrowed**:
/// neither the engine nor the backend ever closes it. Whoever opened the process
/// (see `platform::windows::OwnedProcess`) owns the close.
///
/// One handle keys exactly one symbol session. Two engines must not share a
/// handle at the same time because the backend stores its session state per
/// handle value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle(usize);

impl ProcessHandle
{
    /// Wrap a raw handle value
    pub const fn from_raw(raw: usize) -> Self
    {
        ProcessHandle(raw)
    }

    /// The raw handle value, for handing to platform APIs
    pub const fn raw(self) -> usize
    {
        self.0
    }
}

impl fmt::Display for ProcessHandle
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:X}", self.0)
    }
}
