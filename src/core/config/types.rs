//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs the rest of the service
//! consumes. Raw TOML deserialization types live in `raw.rs`.

use std::path::{Path, PathBuf};

/// HTTP admin API configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Socket address to bind the axum listener to.
    pub bind: String,
}

/// Data file locations.
///
/// Relative paths resolve against `Config::work_dir`; absolute paths are
/// used as-is.
#[derive(Debug, Clone)]
pub struct FilesConfig {
    /// The managed environment file edited through the admin API.
    pub env_file: PathBuf,
    /// Points configuration document (JSON).
    pub points_file: PathBuf,
    /// User accounts and balances (JSON).
    pub users_file: PathBuf,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub http: HttpConfig,
    pub files: FilesConfig,
}

impl Config {
    fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.work_dir.join(p)
        }
    }

    /// Absolute path of the managed env file.
    pub fn env_file_path(&self) -> PathBuf {
        self.resolve(&self.files.env_file)
    }

    /// Absolute path of the points configuration document.
    pub fn points_file_path(&self) -> PathBuf {
        self.resolve(&self.files.points_file)
    }

    /// Absolute path of the user accounts document.
    pub fn users_file_path(&self) -> PathBuf {
        self.resolve(&self.files.users_file)
    }
}
