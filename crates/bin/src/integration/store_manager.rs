//! Filing store and model locations.
//!
//! Everything lives under a platform-specific data directory unless a path
//! is given on the command line.

use hobart_data::{DataError, SqliteStore};
use std::path::{Path, PathBuf};

/// Get the default data directory path.
///
/// Uses platform-specific data directories:
/// - Linux: `~/.local/share/hobart/`
/// - macOS: `~/Library/Application Support/hobart/`
/// - Windows: `%APPDATA%\hobart\`
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hobart")
}

/// Get the default filing store path.
pub(crate) fn default_store_path() -> PathBuf {
    default_data_dir().join("filings.db")
}

/// Get the default location of a trained industry model.
pub(crate) fn default_model_path(sic: u32) -> PathBuf {
    default_data_dir()
        .join("models")
        .join(format!("sic-{sic:04}.json"))
}

/// Resolve an optional path from the command line against a default.
pub(crate) fn resolve(path: Option<PathBuf>, default: impl FnOnce() -> PathBuf) -> PathBuf {
    path.unwrap_or_else(default)
}

/// Create the parent directory of `path` if needed.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Open the filing store, creating the directory if needed.
pub(crate) fn open_store(path: &Path) -> Result<SqliteStore, DataError> {
    ensure_parent(path)?;
    SqliteStore::new(path)
}

/// Print store location and contents.
pub(crate) fn print_store_info(path: &Path, store: &SqliteStore) -> Result<(), DataError> {
    let stats = store.get_stats()?;
    println!("  Store location: {}", path.display());
    println!(
        "  Contents: {} registrants in {} industries, {} filings, {} facts, {} tags",
        stats.registrants, stats.industries, stats.submissions, stats.numbers, stats.tags
    );
    Ok(())
}
