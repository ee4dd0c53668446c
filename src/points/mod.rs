//! Points accounting.
//!
//! Analysis requests cost points: a base amount from the research-depth
//! level (1–5) plus a per-model amount when a model is selected. Either
//! component can be toggled off by the admin. Balances live in a
//! JSON-persisted ledger with strictly non-negative accounts.
//!
//! # Module layout
//!
//! - **config** — `PointsConfig` document and the cached, reloadable
//!   `PointsStore`.
//! - **calc** — pure cost computation over a `PointsConfig` value.
//! - **ledger** — user accounts and the atomic deduction primitive.

pub mod calc;
mod config;
mod ledger;

pub use calc::{CostBreakdown, analysis_points, model_points, quote, research_depth_points};
pub use config::{PointsConfig, PointsStore};
pub use ledger::{Account, Ledger, Role};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PointsError {
    #[error("invalid research depth level {0}: must be between 1 and 5")]
    InvalidLevel(u8),

    #[error("insufficient points for {username}: balance {balance}, need {required}")]
    InsufficientPoints {
        username: String,
        balance: u32,
        required: u32,
    },

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("user already exists: {0}")]
    DuplicateUser(String),

    #[error("points file error: {0}")]
    File(#[from] std::io::Error),

    #[error("points data error: {0}")]
    Parse(#[from] serde_json::Error),
}
