//! Points configuration — document shape, built-in defaults, and the
//! cached store.
//!
//! The JSON document is admin-editable at runtime; a missing file means the
//! built-in defaults below. A file that exists but fails to parse is a
//! surfaced error — silently reverting prices to defaults would misbill.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::PointsError;

/// Points configuration document.
///
/// `research_depth_points` maps level (1–5) to base points; `model_points`
/// is nested by provider, with an optional per-provider `"default"` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_depth_points")]
    pub research_depth_points: BTreeMap<u8, u32>,
    #[serde(default = "default_model_points")]
    pub model_points: BTreeMap<String, BTreeMap<String, u32>>,
    #[serde(default = "default_true")]
    pub enable_research_depth_points: bool,
    #[serde(default = "default_true")]
    pub enable_model_points: bool,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            research_depth_points: default_depth_points(),
            model_points: default_model_points(),
            enable_research_depth_points: true,
            enable_model_points: true,
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

/// Built-in base points for a depth level: 1, 2, 3, 5, 8.
pub(super) fn default_depth_for(level: u8) -> u32 {
    match level {
        1 => 1,
        2 => 2,
        3 => 3,
        4 => 5,
        _ => 8,
    }
}

fn default_depth_points() -> BTreeMap<u8, u32> {
    (1..=5).map(|l| (l, default_depth_for(l))).collect()
}

fn default_model_points() -> BTreeMap<String, BTreeMap<String, u32>> {
    let table: &[(&str, &[(&str, u32)])] = &[
        (
            "dashscope",
            &[
                ("qwen-turbo", 1),
                ("qwen-plus-latest", 2),
                ("qwen-max", 3),
            ],
        ),
        ("deepseek", &[("deepseek-chat", 1)]),
        (
            "google",
            &[
                ("gemini-2.5-pro", 4),
                ("gemini-2.5-flash", 2),
                ("gemini-2.5-flash-lite", 1),
                ("gemini-2.0-flash", 2),
                ("gemini-1.5-pro", 3),
                ("gemini-1.5-flash", 1),
            ],
        ),
        (
            "openai",
            &[
                ("gpt-4o", 5),
                ("gpt-4o-mini", 1),
                ("gpt-4-turbo", 4),
                ("gpt-4", 4),
                ("gpt-3.5-turbo", 1),
            ],
        ),
        ("openrouter", &[("default", 2)]),
        (
            "siliconflow",
            &[
                ("Qwen/Qwen3-30B-A3B-Thinking-2507", 3),
                ("Qwen/Qwen3-30B-A3B-Instruct-2507", 2),
                ("Qwen/Qwen3-235B-A22B-Thinking-2507", 5),
                ("Qwen/Qwen3-235B-A22B-Instruct-2507", 4),
                ("deepseek-ai/DeepSeek-R1", 3),
                ("zai-org/GLM-4.5", 3),
                ("moonshotai/Kimi-K2-Instruct", 2),
            ],
        ),
        ("custom_openai", &[("default", 2)]),
        ("qianfan", &[("default", 2)]),
    ];

    table
        .iter()
        .map(|(provider, models)| {
            (
                provider.to_string(),
                models
                    .iter()
                    .map(|(m, p)| (m.to_string(), *p))
                    .collect(),
            )
        })
        .collect()
}

pub(super) fn normalize_provider(provider: &str) -> String {
    provider.trim().to_lowercase()
}

pub(super) fn normalize_model(model: &str) -> &str {
    model.trim()
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Process-wide points configuration: a JSON file path plus a cached copy.
///
/// Calculators never read the store directly — handlers take a
/// [`snapshot`](Self::snapshot) and pass the value in, so computation stays
/// testable in isolation. Mutations persist first and only then replace the
/// cache.
pub struct PointsStore {
    path: PathBuf,
    cache: RwLock<PointsConfig>,
}

impl PointsStore {
    /// Open the store. Missing file → built-in defaults; unreadable or
    /// corrupt file → error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PointsError> {
        let path = path.into();
        let config = load_config(&path)?;
        Ok(Self {
            path,
            cache: RwLock::new(config),
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PointsConfig> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, PointsConfig> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Current configuration value.
    pub fn snapshot(&self) -> PointsConfig {
        self.read().clone()
    }

    /// Re-read the file, replacing the cache.
    pub fn reload(&self) -> Result<(), PointsError> {
        let config = load_config(&self.path)?;
        *self.write() = config;
        info!(path = %self.path.display(), "points config reloaded");
        Ok(())
    }

    /// Set the base points for a depth level.
    pub fn set_depth_points(&self, level: u8, points: u32) -> Result<(), PointsError> {
        if !(1..=5).contains(&level) {
            return Err(PointsError::InvalidLevel(level));
        }
        self.mutate(|cfg| {
            cfg.research_depth_points.insert(level, points);
        })
    }

    /// Set the points for a `(provider, model)` pair.
    pub fn set_model_points(
        &self,
        provider: &str,
        model: &str,
        points: u32,
    ) -> Result<(), PointsError> {
        let provider = normalize_provider(provider);
        let model = normalize_model(model).to_string();
        self.mutate(|cfg| {
            cfg.model_points.entry(provider).or_default().insert(model, points);
        })
    }

    /// Remove a `(provider, model)` entry. Returns whether it existed.
    pub fn delete_model_points(&self, provider: &str, model: &str) -> Result<bool, PointsError> {
        let provider = normalize_provider(provider);
        let model = normalize_model(model).to_string();
        let mut removed = false;
        self.mutate(|cfg| {
            if let Some(models) = cfg.model_points.get_mut(&provider) {
                removed = models.remove(&model).is_some();
                if models.is_empty() {
                    cfg.model_points.remove(&provider);
                }
            }
        })?;
        Ok(removed)
    }

    /// Flip the two consumption toggles.
    pub fn set_toggles(
        &self,
        enable_research_depth_points: bool,
        enable_model_points: bool,
    ) -> Result<(), PointsError> {
        self.mutate(|cfg| {
            cfg.enable_research_depth_points = enable_research_depth_points;
            cfg.enable_model_points = enable_model_points;
        })
    }

    /// Apply `f` to a copy, persist it, then swap it into the cache.
    /// A failed write leaves both the file and the cache untouched.
    fn mutate(&self, f: impl FnOnce(&mut PointsConfig)) -> Result<(), PointsError> {
        let mut guard = self.write();
        let mut next = guard.clone();
        f(&mut next);
        persist(&self.path, &next)?;
        *guard = next;
        Ok(())
    }
}

fn load_config(path: &Path) -> Result<PointsConfig, PointsError> {
    if !path.exists() {
        return Ok(PointsConfig::default());
    }
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn persist(path: &Path, config: &PointsConfig) -> Result<(), PointsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = PointsStore::open(dir.path().join("points.json")).unwrap();
        let cfg = store.snapshot();
        assert_eq!(cfg.research_depth_points.get(&4), Some(&5));
        assert!(cfg.enable_model_points);
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            PointsStore::open(&path),
            Err(PointsError::Parse(_))
        ));
    }

    #[test]
    fn mutations_persist_and_survive_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.json");
        let store = PointsStore::open(&path).unwrap();

        store.set_model_points("DashScope", " qwen-max ", 7).unwrap();
        store.set_depth_points(3, 10).unwrap();
        store.set_toggles(true, false).unwrap();

        // a second store over the same file sees everything
        let other = PointsStore::open(&path).unwrap();
        let cfg = other.snapshot();
        assert_eq!(cfg.model_points["dashscope"]["qwen-max"], 7);
        assert_eq!(cfg.research_depth_points[&3], 10);
        assert!(!cfg.enable_model_points);
    }

    #[test]
    fn depth_level_bounds_enforced() {
        let dir = TempDir::new().unwrap();
        let store = PointsStore::open(dir.path().join("points.json")).unwrap();
        assert!(matches!(
            store.set_depth_points(0, 1),
            Err(PointsError::InvalidLevel(0))
        ));
        assert!(matches!(
            store.set_depth_points(6, 1),
            Err(PointsError::InvalidLevel(6))
        ));
    }

    #[test]
    fn delete_model_points_reports_presence() {
        let dir = TempDir::new().unwrap();
        let store = PointsStore::open(dir.path().join("points.json")).unwrap();
        assert!(store.delete_model_points("dashscope", "qwen-max").unwrap());
        assert!(!store.delete_model_points("dashscope", "qwen-max").unwrap());
        assert!(!store.delete_model_points("nobody", "nothing").unwrap());
    }

    #[test]
    fn depth_keys_serialize_as_strings() {
        let json = serde_json::to_value(PointsConfig::default()).unwrap();
        assert_eq!(json["research_depth_points"]["3"], 3);
        assert_eq!(json["version"], "1.0");
    }

    #[test]
    fn reload_drops_in_memory_changes_missing_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.json");
        let store = PointsStore::open(&path).unwrap();
        store.set_depth_points(1, 42).unwrap();
        // overwrite the file behind the store's back, then reload
        fs::write(&path, serde_json::to_string(&PointsConfig::default()).unwrap()).unwrap();
        store.reload().unwrap();
        assert_eq!(store.snapshot().research_depth_points[&1], 1);
    }
}
