//! Default on-disk locations.

use std::path::PathBuf;

/// Default location of the memory database file.
///
/// Resolves under the platform's local data directory, falling back to the
/// current directory when none is available.
#[must_use]
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mnemo")
        .join("memory.db")
}
