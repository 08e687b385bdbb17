//! Centralized path utilities
//!
//! All application paths in one place for consistency

use std::path::PathBuf;

use crate::constants::storage;

/// Get the timebank config directory (~/.timebank)
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(storage::CONFIG_DIR_NAME)
}

/// Get the config file path (~/.timebank/config.toml)
pub fn config_file() -> PathBuf {
    config_dir().join(storage::CONFIG_FILE_NAME)
}

/// Get the default database path (~/.timebank/timebank.db)
pub fn database_path() -> PathBuf {
    config_dir().join(storage::DATABASE_FILE_NAME)
}
