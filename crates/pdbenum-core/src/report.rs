//! Result payloads handed to the output formatter.
//!
//! Every field except `Success` is optional: a lookup that found the module but
//! not the symbol, or failed after loading the module, still reports what it
//! has. Serialized keys are PascalCase; absent fields are omitted.

use serde::{Deserialize, Serialize};

use crate::types::{Address, DebugInfo, ModuleDescriptor, SymbolRecord};

/// Outcome of searching one name (or resolving one address)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResult
{
    /// Module that was searched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleDescriptor>,
    /// Debug information of that module
    #[serde(rename = "PdbInfo", default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
    /// The matching symbol, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolRecord>,
    /// Whether the search ran (top level) or found something (batch entry)
    pub success: bool,
    /// Why the search failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// The name (or address) exactly as requested
    #[serde(rename = "SearchedSymbolName", default, skip_serializing_if = "Option::is_none")]
    pub searched_name: Option<String>,
}

impl SearchResult
{
    /// Batch entry for `name`; successful when a symbol was found.
    pub fn entry(name: impl Into<String>, symbol: Option<SymbolRecord>) -> Self
    {
        Self {
            success: symbol.is_some(),
            symbol,
            searched_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Batch entry for an address; placeholders become "not found".
    pub fn for_address(address: Address, record: SymbolRecord) -> Self
    {
        let symbol = (!record.is_placeholder()).then_some(record);
        Self::entry(address.to_string(), symbol)
    }
}

/// Outcome of searching several names or addresses in one module
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchSearchResult
{
    /// Module that was searched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleDescriptor>,
    /// Debug information of that module
    #[serde(rename = "PdbInfo", default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
    /// One entry per request, in request order
    #[serde(default)]
    pub symbols: Vec<SearchResult>,
    /// Whether the search ran
    pub success: bool,
    /// Why the search failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BatchSearchResult
{
    /// How many entries found a symbol
    pub fn found_count(&self) -> usize
    {
        self.symbols.iter().filter(|entry| entry.symbol.is_some()).count()
    }
}

/// Every symbol of a module matching a mask
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SymbolListResult
{
    /// Module that was enumerated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleDescriptor>,
    /// Debug information of that module
    #[serde(rename = "PdbInfo", default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
    /// Name mask the symbols were filtered with
    pub mask: String,
    /// Matching symbols in enumeration order
    #[serde(default)]
    pub symbols: Vec<SymbolRecord>,
    /// Whether the enumeration ran
    pub success: bool,
    /// Why it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
