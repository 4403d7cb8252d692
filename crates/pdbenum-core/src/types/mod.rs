//! Core types shared by the engine, the backends and the result formatter.

pub mod address;
pub mod module;
pub mod process;
pub mod symbols;

pub use address::Address;
pub use module::ModuleDescriptor;
pub use process::{ProcessHandle, ProcessId};
pub use symbols::{DebugInfo, SymbolKind, SymbolRecord};
