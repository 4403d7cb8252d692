//! # Result Formatter
//!
//! Renders lookup results as human-readable text, JSON or XML.
//!
//! - **Human**: the layout the command-line tool prints (`Module: ...`,
//!   `PDB Information: ...`, `Symbol found!`).
//! - **JSON**: `serde_json`, one compact document, PascalCase keys.
//! - **XML**: `quick-xml`'s serde serializer with an XML declaration; the root
//!   element is named after the result kind (`SymbolSearchResult`,
//!   `BatchSymbolSearchResult`, `SymbolListResult`). Lists get one wrapper
//!   element with an item element per entry
//!   (`<Symbols><SymbolSearchResult>...</SymbolSearchResult></Symbols>`), so
//!   the documents read back with an ordinary XML deserializer.
//!
//! Absent values (no symbol, no module, no debug info) are left out of the
//! structured formats rather than written as nulls.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{PdbEnumError, PdbEnumResult};
use crate::report::{BatchSearchResult, SearchResult, SymbolListResult};
use crate::types::{DebugInfo, ModuleDescriptor, SymbolRecord};

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat
{
    /// Plain text for people
    #[default]
    Human,
    /// JSON document
    Json,
    /// XML document
    Xml,
}

impl FromStr for OutputFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "xml" => Ok(OutputFormat::Xml),
            _ => Err(format!("Unknown output format: {s}. Use 'human', 'json' or 'xml'")),
        }
    }
}

impl fmt::Display for OutputFormat
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            OutputFormat::Human => "human",
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
        };
        f.write_str(label)
    }
}

/// A result the formatter knows how to render
pub trait Report: Serialize
{
    /// Root element name used for XML output
    const XML_ROOT: &'static str;

    /// Plain-text rendering
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()>;

    /// Whether the lookup behind this report completed
    fn succeeded(&self) -> bool;

    /// XML body (without the declaration)
    fn to_xml(&self) -> PdbEnumResult<String>
    where
        Self: Sized,
    {
        xml_element(Self::XML_ROOT, self)
    }
}

/// Write `report` to `out` in `format`
///
/// ## Errors
///
/// - `Serialization`: the report could not be encoded as JSON or XML
/// - `Io`: writing to `out` failed
pub fn write_report<R: Report>(report: &R, format: OutputFormat, out: &mut dyn Write) -> PdbEnumResult<()>
{
    match format {
        OutputFormat::Human => report.write_human(out)?,
        OutputFormat::Json => {
            let json = serde_json::to_string(report).map_err(|err| PdbEnumError::Serialization(err.to_string()))?;
            writeln!(out, "{json}")?;
        }
        OutputFormat::Xml => {
            let xml = report.to_xml()?;
            writeln!(out, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
            writeln!(out, "{xml}")?;
        }
    }
    out.flush()?;
    Ok(())
}

fn xml_element<T: Serialize>(root: &str, value: &T) -> PdbEnumResult<String>
{
    quick_xml::se::to_string_with_root(root, value).map_err(|err| PdbEnumError::Serialization(err.to_string()))
}

/// `<Symbols>` wrapper holding one `<SymbolSearchResult>` per batch entry
#[derive(Serialize)]
struct SearchResultList<'a>
{
    #[serde(rename = "SymbolSearchResult")]
    items: &'a [SearchResult],
}

/// `<Symbols>` wrapper holding one `<SymbolInfo>` per listed symbol
#[derive(Serialize)]
struct SymbolInfoList<'a>
{
    #[serde(rename = "SymbolInfo")]
    items: &'a [SymbolRecord],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BatchDocument<'a>
{
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<&'a ModuleDescriptor>,
    #[serde(rename = "PdbInfo", skip_serializing_if = "Option::is_none")]
    debug_info: Option<&'a DebugInfo>,
    symbols: SearchResultList<'a>,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListDocument<'a>
{
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<&'a ModuleDescriptor>,
    #[serde(rename = "PdbInfo", skip_serializing_if = "Option::is_none")]
    debug_info: Option<&'a DebugInfo>,
    mask: &'a str,
    symbols: SymbolInfoList<'a>,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
}

/// Render `report` into a string
///
/// ## Errors
///
/// Same as [`write_report`].
pub fn render<R: Report>(report: &R, format: OutputFormat) -> PdbEnumResult<String>
{
    let mut buffer = Vec::new();
    write_report(report, format, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| PdbEnumError::Serialization(err.to_string()))
}

impl Report for SearchResult
{
    const XML_ROOT: &'static str = "SymbolSearchResult";

    fn write_human(&self, out: &mut dyn Write) -> io::Result<()>
    {
        if !self.success {
            return writeln!(out, "Error: {}", self.error_message.as_deref().unwrap_or("unknown error"));
        }

        if let Some(module) = &self.module {
            writeln!(out, "{module}")?;
            writeln!(out)?;
        }
        if let Some(debug_info) = &self.debug_info {
            writeln!(out, "{debug_info}")?;
            writeln!(out)?;
        }

        match (&self.symbol, &self.searched_name) {
            (Some(symbol), _) => {
                writeln!(out, "Symbol found!")?;
                writeln!(out, "{symbol}")
            }
            (None, Some(_)) => {
                writeln!(out, "Symbol not found.")?;
                writeln!(out)?;
                writeln!(out, "Tip: The search is case-insensitive and matches partial names.")?;
                writeln!(out, "     Try a shorter or different part of the symbol name.")
            }
            (None, None) => Ok(()),
        }
    }

    fn succeeded(&self) -> bool
    {
        self.success
    }
}

impl Report for BatchSearchResult
{
    const XML_ROOT: &'static str = "BatchSymbolSearchResult";

    fn write_human(&self, out: &mut dyn Write) -> io::Result<()>
    {
        if !self.success {
            return writeln!(out, "Error: {}", self.error_message.as_deref().unwrap_or("unknown error"));
        }

        if let Some(module) = &self.module {
            writeln!(out, "{module}")?;
            writeln!(out)?;
        }
        if let Some(debug_info) = &self.debug_info {
            writeln!(out, "{debug_info}")?;
            writeln!(out)?;
        }

        if self.symbols.is_empty() {
            return Ok(());
        }

        writeln!(out, "Symbol Search Results ({} symbols):", self.symbols.len())?;
        writeln!(out)?;
        for entry in &self.symbols {
            writeln!(out, "Searched for: {}", entry.searched_name.as_deref().unwrap_or_default())?;
            match &entry.symbol {
                Some(symbol) => {
                    writeln!(out, "  Found!")?;
                    writeln!(out, "  {}", symbol.to_string().replace('\n', "\n  "))?;
                }
                None => writeln!(out, "  Not found.")?,
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn succeeded(&self) -> bool
    {
        self.success
    }

    fn to_xml(&self) -> PdbEnumResult<String>
    {
        let document = BatchDocument {
            module: self.module.as_ref(),
            debug_info: self.debug_info.as_ref(),
            symbols: SearchResultList { items: &self.symbols },
            success: self.success,
            error_message: self.error_message.as_deref(),
        };
        xml_element(Self::XML_ROOT, &document)
    }
}

impl Report for SymbolListResult
{
    const XML_ROOT: &'static str = "SymbolListResult";

    fn write_human(&self, out: &mut dyn Write) -> io::Result<()>
    {
        if !self.success {
            return writeln!(out, "Error: {}", self.error_message.as_deref().unwrap_or("unknown error"));
        }

        if let Some(module) = &self.module {
            writeln!(out, "{module}")?;
            writeln!(out)?;
        }
        if let Some(debug_info) = &self.debug_info {
            writeln!(out, "{debug_info}")?;
            writeln!(out)?;
        }

        writeln!(out, "Symbols matching '{}' ({} symbols):", self.mask, self.symbols.len())?;
        for symbol in &self.symbols {
            writeln!(out, "  {:<18} {} ({} bytes)", symbol.address.to_string(), symbol.name, symbol.size)?;
        }
        Ok(())
    }

    fn succeeded(&self) -> bool
    {
        self.success
    }

    fn to_xml(&self) -> PdbEnumResult<String>
    {
        let document = ListDocument {
            module: self.module.as_ref(),
            debug_info: self.debug_info.as_ref(),
            mask: &self.mask,
            symbols: SymbolInfoList { items: &self.symbols },
            success: self.success,
            error_message: self.error_message.as_deref(),
        };
        xml_element(Self::XML_ROOT, &document)
    }
}
