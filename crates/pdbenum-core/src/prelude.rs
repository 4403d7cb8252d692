//! Common module for library exports

pub use crate::backend::{BackendVariant, PlatformError, SymOptions, SymbolBackend};
pub use crate::engine::{SessionState, SymbolEngine};
pub use crate::error::{PdbEnumError, PdbEnumResult};
pub use crate::locator::ModuleLocator;
pub use crate::lookup::Target;
pub use crate::output::{OutputFormat, Report};
pub use crate::report::{BatchSearchResult, SearchResult, SymbolListResult};
pub use crate::types::{Address, DebugInfo, ModuleDescriptor, ProcessHandle, ProcessId, SymbolKind, SymbolRecord};
