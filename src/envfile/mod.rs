//! Environment-file config editor.
//!
//! Manages a `.env`-style file for the admin surface: loads it into
//! categorized key/value records, validates edits against per-key rules,
//! stages changes in memory, and writes back preserving comments and line
//! order. Whole-file import/export and timestamped backups included.
//!
//! # Module layout
//!
//! - **document** — Line-preserving document model (`EnvDocument`).
//! - **catalog** — Known-key table: categories, sensitivity, defaults.
//! - **validate** — Name and per-key value rules.
//! - **store** — `EnvStore`: staged edits, save/backup, import/export.

mod catalog;
mod document;
mod store;
mod validate;

pub use catalog::{Category, KeySpec, lookup, mask};
pub use document::EnvDocument;
pub use store::{EnvStore, EnvVariable};
pub use validate::{valid_name, validate};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid variable name '{0}': must be upper-case letters, digits and underscores")]
    InvalidName(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("env file error: {0}")]
    File(#[from] std::io::Error),
}
