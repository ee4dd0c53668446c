//! Name and per-key value validation.
//!
//! Names follow the strict upper-snake form. Values are checked against the
//! rules for the handful of keys that have a constrained format; unknown
//! keys accept any string. An empty value always validates — it means the
//! variable is being unset, and the record keeps its place in the file.

use super::EnvError;

const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];
const BOOL_TOKENS: &[&str] = &["true", "false", "1", "0", "yes", "no"];
const BOOL_KEYS: &[&str] = &["OPENAI_ENABLED", "DOCKER_CONTAINER"];

/// `[A-Z][A-Z0-9_]*` — upper-case start, then upper-case letters, digits
/// and underscores.
pub fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Validate a `(name, value)` pair against the known-key rules.
pub fn validate(name: &str, value: &str) -> Result<(), EnvError> {
    if !valid_name(name) {
        return Err(EnvError::InvalidName(name.to_string()));
    }

    // Empty means unset — per-key format rules don't apply.
    if value.is_empty() {
        return Ok(());
    }

    if name == "MONGODB_PORT" {
        let port: u32 = value.parse().map_err(|_| EnvError::InvalidValue {
            key: name.to_string(),
            reason: "port must be an integer".to_string(),
        })?;
        if !(1..=65535).contains(&port) {
            return Err(EnvError::InvalidValue {
                key: name.to_string(),
                reason: "port must be between 1 and 65535".to_string(),
            });
        }
    }

    if name == "LOG_LEVEL" && !LOG_LEVELS.contains(&value.to_uppercase().as_str()) {
        return Err(EnvError::InvalidValue {
            key: name.to_string(),
            reason: format!("log level must be one of: {}", LOG_LEVELS.join(", ")),
        });
    }

    if BOOL_KEYS.contains(&name) && !BOOL_TOKENS.contains(&value.to_lowercase().as_str()) {
        return Err(EnvError::InvalidValue {
            key: name.to_string(),
            reason: "boolean must be one of: true/false, 1/0, yes/no".to_string(),
        });
    }

    Ok(())
}
