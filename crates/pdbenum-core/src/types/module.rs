//! Loaded-module descriptor.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Address;

/// A module (DLL or EXE image) mapped into the target process
///
/// Produced by a [`ModuleLocator`](crate::locator::ModuleLocator) and consumed
/// read-only by the engine. It is a value snapshot: nothing in here points back
/// at the process or the symbol session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleDescriptor
{
    /// File name of the image, e.g. `kernel32.dll`
    pub name: String,
    /// Full on-disk path of the image
    pub full_path: String,
    /// Address the image is mapped at
    pub base_address: Address,
    /// Size of the mapped image in bytes
    pub size: u32,
    /// Image entry point
    pub entry_point: Address,
}

impl ModuleDescriptor
{
    /// Whether `address` falls inside this module's mapped range.
    pub fn contains(&self, address: Address) -> bool
    {
        self.base_address.contains(self.size, address)
    }
}

impl fmt::Display for ModuleDescriptor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        writeln!(f, "Module: {}", self.name)?;
        writeln!(f, "  Path: {}", self.full_path)?;
        writeln!(f, "  Base Address: {}", self.base_address)?;
        writeln!(f, "  Size: {} bytes", self.size)?;
        write!(f, "  Entry Point: {}", self.entry_point)
    }
}
