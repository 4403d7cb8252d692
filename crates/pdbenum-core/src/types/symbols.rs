//! Symbol and debug-information types.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Address;

/// Kind of debug information the backend managed to load for a module.
///
/// Mirrors the backend's `SYM_TYPE` values. Anything the backend reports that
/// we don't know about is kept as [`SymbolKind::Unknown`] with its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum SymbolKind
{
    /// No symbols are loaded
    None,
    /// COFF symbols
    Coff,
    /// CodeView symbols
    CodeView,
    /// Symbols from a PDB file
    Pdb,
    /// Only the export table is available
    Export,
    /// Symbol loading was deferred
    Deferred,
    /// `.sym` file
    Sym,
    /// Symbols read through DIA
    Dia,
    /// Virtual module created by the backend
    Virtual,
    /// A value newer than this enum
    Unknown(u32),
}

impl SymbolKind
{
    /// Raw `SYM_TYPE` value
    pub fn raw(self) -> u32
    {
        u32::from(self)
    }
}

impl From<u32> for SymbolKind
{
    fn from(raw: u32) -> Self
    {
        match raw {
            0 => SymbolKind::None,
            1 => SymbolKind::Coff,
            2 => SymbolKind::CodeView,
            3 => SymbolKind::Pdb,
            4 => SymbolKind::Export,
            5 => SymbolKind::Deferred,
            6 => SymbolKind::Sym,
            7 => SymbolKind::Dia,
            8 => SymbolKind::Virtual,
            other => SymbolKind::Unknown(other),
        }
    }
}

impl From<SymbolKind> for u32
{
    fn from(kind: SymbolKind) -> Self
    {
        match kind {
            SymbolKind::None => 0,
            SymbolKind::Coff => 1,
            SymbolKind::CodeView => 2,
            SymbolKind::Pdb => 3,
            SymbolKind::Export => 4,
            SymbolKind::Deferred => 5,
            SymbolKind::Sym => 6,
            SymbolKind::Dia => 7,
            SymbolKind::Virtual => 8,
            SymbolKind::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for SymbolKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SymbolKind::None => write!(f, "None"),
            SymbolKind::Coff => write!(f, "COFF"),
            SymbolKind::CodeView => write!(f, "CodeView"),
            SymbolKind::Pdb => write!(f, "PDB"),
            SymbolKind::Export => write!(f, "Export"),
            SymbolKind::Deferred => write!(f, "Deferred"),
            SymbolKind::Sym => write!(f, "SYM"),
            SymbolKind::Dia => write!(f, "DIA"),
            SymbolKind::Virtual => write!(f, "Virtual"),
            SymbolKind::Unknown(raw) => write!(f, "Unknown ({raw})"),
        }
    }
}

/// Debug-information metadata for a loaded module ("PDB info").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo
{
    /// PDB signature GUID (nil when no PDB matched)
    #[serde(rename = "PdbGuid")]
    pub guid: Uuid,
    /// PDB age
    #[serde(rename = "PdbAge")]
    pub age: u32,
    /// Path of the loaded PDB, empty when none
    #[serde(rename = "PdbFileName")]
    pub file_name: String,
    /// What the backend says it loaded
    #[serde(rename = "SymType")]
    pub symbol_kind: SymbolKind,
}

impl DebugInfo
{
    /// The kind to show to users.
    ///
    /// The backend sometimes reports `PDB` for modules where no PDB was actually
    /// matched; those only have exports, so they are shown as `Export`.
    pub fn effective_kind(&self) -> SymbolKind
    {
        if self.symbol_kind == SymbolKind::Pdb && (self.guid.is_nil() || self.file_name.is_empty()) {
            SymbolKind::Export
        } else {
            self.symbol_kind
        }
    }
}

impl fmt::Display for DebugInfo
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let kind = self.effective_kind();
        writeln!(f, "PDB Information:")?;
        if self.guid.is_nil() {
            writeln!(f, "  Symbol Type: {kind}")?;
            if self.file_name.is_empty() {
                write!(f, "  PDB File: (No PDB loaded - using exports only)")
            } else {
                write!(f, "  PDB File: {}", self.file_name)
            }
        } else {
            writeln!(f, "  GUID: {}", self.guid.hyphenated())?;
            writeln!(f, "  Age: {}", self.age)?;
            writeln!(f, "  PDB File: {}", self.file_name)?;
            write!(f, "  Symbol Type: {kind}")
        }
    }
}

/// A symbol found in a loaded module
///
/// Snapshots taken inside an enumeration callback; the name is copied out of
/// backend memory before the callback returns.
///
/// Batch address resolution hands back *placeholders* for addresses no symbol
/// starts at: the requested address with an empty name and zeroed fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SymbolRecord
{
    /// Undecorated symbol name
    pub name: String,
    /// Virtual address of the symbol in the target process
    pub address: Address,
    /// Size in bytes (0 when the backend doesn't know)
    pub size: u32,
    /// Backend `SYMFLAG_*` bits
    pub flags: u32,
    /// Backend `SymTag` value
    pub tag: u32,
}

impl SymbolRecord
{
    /// An unresolved entry for `address`.
    pub fn placeholder(address: Address) -> Self
    {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Whether this entry was never filled in by an enumeration.
    pub fn is_placeholder(&self) -> bool
    {
        self.name.is_empty()
    }
}

impl fmt::Display for SymbolRecord
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        writeln!(f, "Symbol: {}", self.name)?;
        writeln!(f, "  Address: {}", self.address)?;
        writeln!(f, "  Size: {} bytes", self.size)?;
        writeln!(f, "  Flags: 0x{:X}", self.flags)?;
        write!(f, "  Tag: {}", self.tag)
    }
}
