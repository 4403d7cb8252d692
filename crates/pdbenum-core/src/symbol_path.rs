//! # Symbol Search Path
//!
//! Builds the search path handed to the backend when the caller doesn't supply
//! one: a local download cache in front of the public Microsoft symbol store,
//! in the backend's `SRV*<cache>*<store>` syntax.

use std::env;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

/// Public Microsoft symbol store
pub const PUBLIC_SYMBOL_STORE: &str = "https://msdl.microsoft.com/download/symbols";

/// Name of the cache directory created under the temp directory
pub const CACHE_DIR_NAME: &str = "PdbEnum_Symbols";

/// Default search path, with the cache under the system temp directory.
pub fn default_search_path() -> String
{
    default_search_path_in(&env::temp_dir())
}

/// Default search path, with the cache under `parent`
///
/// Creates `<parent>/PdbEnum_Symbols` if needed. If the directory can't be
/// created, falls back to the bare store URL so symbols are still fetched,
/// just not cached.
pub fn default_search_path_in(parent: &Path) -> String
{
    let cache_dir = parent.join(CACHE_DIR_NAME);
    if !cache_dir.is_dir() {
        if let Err(err) = fs::create_dir_all(&cache_dir) {
            warn!("Failed to create symbol cache directory {}: {err}", cache_dir.display());
            return PUBLIC_SYMBOL_STORE.to_string();
        }
        debug!("Created symbol cache directory: {}", cache_dir.display());
    }
    server_path(&cache_dir, PUBLIC_SYMBOL_STORE)
}

/// `SRV*<cache_dir>*<store>`
pub fn server_path(cache_dir: &Path, store: &str) -> String
{
    format!("SRV*{}*{store}", cache_dir.display())
}
