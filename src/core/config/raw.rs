//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape — serde target before resolution.
#[derive(Deserialize)]
pub(super) struct RawConfig {
    pub service: RawService,
    #[serde(default)]
    pub http: RawHttp,
    #[serde(default)]
    pub files: RawFiles,
}

#[derive(Deserialize)]
pub(super) struct RawService {
    pub name: String,
    pub work_dir: String,
    pub log_level: String,
}

// ── HTTP ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawHttp {
    #[serde(default = "default_http_bind")]
    pub bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self {
            bind: default_http_bind(),
        }
    }
}

// ── Files ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawFiles {
    #[serde(default = "default_env_file")]
    pub env_file: String,
    #[serde(default = "default_points_file")]
    pub points_file: String,
    #[serde(default = "default_users_file")]
    pub users_file: String,
}

impl Default for RawFiles {
    fn default() -> Self {
        Self {
            env_file: default_env_file(),
            points_file: default_points_file(),
            users_file: default_users_file(),
        }
    }
}

// ── Default functions (used by serde) ────────────────────────────────────────

pub(super) fn default_http_bind() -> String {
    "127.0.0.1:8085".to_string()
}

pub(super) fn default_env_file() -> String {
    ".env".to_string()
}

pub(super) fn default_points_file() -> String {
    "points.json".to_string()
}

pub(super) fn default_users_file() -> String {
    "users.json".to_string()
}
