//! Env-file store — staged edits over a loaded document.
//!
//! The store owns the file path and a mutex-guarded state: the last loaded
//! document plus a staged-edit overlay. Reads merge the overlay; nothing
//! touches disk until [`EnvStore::save`]. Save and import back up the
//! current file first and hold the lock for the whole backup+write, so two
//! writers can never interleave on the same path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::info;

use super::EnvError;
use super::catalog::{self, Category, KNOWN_KEYS};
use super::document::EnvDocument;
use super::validate;

/// One variable as presented to the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct EnvVariable {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: Category,
    pub sensitive: bool,
    pub default_value: Option<String>,
    /// Raw value — masking for display is the caller's concern.
    pub value: String,
    pub is_set: bool,
    /// Whether an unsaved staged edit applies to this variable.
    pub staged: bool,
}

struct State {
    path: PathBuf,
    doc: EnvDocument,
    staged: BTreeMap<String, String>,
}

/// Staged-edit store over a `.env` file.
pub struct EnvStore {
    inner: Mutex<State>,
}

impl EnvStore {
    /// Open a store over `path`. A missing file yields an empty document —
    /// the file is created on first save.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EnvError> {
        let path = path.into();
        let doc = read_document(&path)?;
        Ok(Self {
            inner: Mutex::new(State {
                path,
                doc,
                staged: BTreeMap::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    /// Re-read the file, dropping staged edits.
    pub fn reload(&self) -> Result<(), EnvError> {
        let mut state = self.lock();
        state.doc = read_document(&state.path)?;
        state.staged.clear();
        Ok(())
    }

    /// Current value of `name`: staged overlay first, then the document.
    pub fn get(&self, name: &str) -> Option<String> {
        let state = self.lock();
        state
            .staged
            .get(name)
            .cloned()
            .or_else(|| state.doc.get(name).map(str::to_string))
    }

    /// Validate and stage an edit. Staging a value identical to the saved
    /// one removes any pending edit instead.
    pub fn set(&self, name: &str, value: &str) -> Result<(), EnvError> {
        validate::validate(name, value)?;
        let mut state = self.lock();
        if state.doc.get(name) == Some(value) {
            state.staged.remove(name);
        } else {
            state.staged.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }

    /// Stage the empty string — the record remains in the file, unset.
    pub fn clear(&self, name: &str) -> Result<(), EnvError> {
        self.set(name, "")
    }

    /// Stage the catalog default (empty when the key has none). Returns the
    /// value that was staged.
    pub fn reset(&self, name: &str) -> Result<String, EnvError> {
        let default = catalog::lookup(name)
            .and_then(|s| s.default)
            .unwrap_or_default()
            .to_string();
        self.set(name, &default)?;
        Ok(default)
    }

    /// Drop all staged edits.
    pub fn discard(&self) {
        self.lock().staged.clear();
    }

    pub fn staged_count(&self) -> usize {
        self.lock().staged.len()
    }

    /// All variables for display: the full catalog in order (set or not),
    /// then unknown keys from the file, then staged-only additions.
    pub fn variables(&self) -> Vec<EnvVariable> {
        let state = self.lock();
        let mut vars = Vec::new();

        for spec in KNOWN_KEYS {
            let staged = state.staged.contains_key(spec.key);
            let value = state
                .staged
                .get(spec.key)
                .cloned()
                .or_else(|| state.doc.get(spec.key).map(str::to_string))
                .unwrap_or_default();
            vars.push(EnvVariable {
                name: spec.key.to_string(),
                display_name: spec.name.to_string(),
                description: spec.description.to_string(),
                category: spec.category,
                sensitive: spec.sensitive,
                default_value: spec.default.map(str::to_string),
                is_set: !value.is_empty(),
                staged,
                value,
            });
        }

        for (key, file_value) in state.doc.entries() {
            if catalog::lookup(&key).is_some() {
                continue;
            }
            let staged = state.staged.contains_key(&key);
            let value = state.staged.get(&key).cloned().unwrap_or(file_value);
            vars.push(custom_variable(key, value, staged));
        }

        for (key, value) in &state.staged {
            if catalog::lookup(key).is_some() || state.doc.contains(key) {
                continue;
            }
            vars.push(custom_variable(key.clone(), value.clone(), true));
        }

        vars
    }

    /// Back up the current file, then write the staged state in place.
    /// Original line order and comments survive; new keys are appended.
    /// Returns the backup path (`None` when no file existed yet).
    pub fn save(&self) -> Result<Option<PathBuf>, EnvError> {
        let mut state = self.lock();
        let backup = backup_file(&state.path)?;
        let mut doc = state.doc.clone();
        for (k, v) in &state.staged {
            doc.set(k, v);
        }
        write_file(&state.path, &doc.serialize())?;
        state.doc = doc;
        state.staged.clear();
        info!(path = %state.path.display(), "env file saved");
        Ok(backup)
    }

    /// Serialized form of the last saved document (staged edits excluded).
    pub fn export(&self) -> String {
        self.lock().doc.serialize()
    }

    /// Replace the whole file. The previous file is backed up first; staged
    /// edits are dropped.
    pub fn import(&self, text: &str) -> Result<Option<PathBuf>, EnvError> {
        let mut state = self.lock();
        let backup = backup_file(&state.path)?;
        write_file(&state.path, text)?;
        state.doc = EnvDocument::parse(text);
        state.staged.clear();
        info!(path = %state.path.display(), "env file replaced by import");
        Ok(backup)
    }
}

fn read_document(path: &Path) -> Result<EnvDocument, EnvError> {
    if path.exists() {
        Ok(EnvDocument::parse(&fs::read_to_string(path)?))
    } else {
        Ok(EnvDocument::default())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), EnvError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Copy `path` to `<name>.backup_<YYYYmmdd_HHMMSS>` alongside it.
fn backup_file(path: &Path) -> Result<Option<PathBuf>, EnvError> {
    if !path.exists() {
        return Ok(None);
    }
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "env".to_string());
    let backup = path.with_file_name(format!("{name}.backup_{ts}"));
    fs::copy(path, &backup)?;
    Ok(Some(backup))
}

fn custom_variable(name: String, value: String, staged: bool) -> EnvVariable {
    EnvVariable {
        display_name: name.clone(),
        description: "Custom variable".to_string(),
        category: Category::Other,
        sensitive: catalog::is_sensitive(&name),
        default_value: None,
        is_set: !value.is_empty(),
        staged,
        value,
        name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
# keys
DASHSCOPE_API_KEY=sk-abc123

MONGODB_PORT=27017
CUSTOM_FLAG=on
";

    fn store_with(dir: &TempDir, contents: &str) -> EnvStore {
        let path = dir.path().join(".env");
        fs::write(&path, contents).unwrap();
        EnvStore::open(path).unwrap()
    }

    #[test]
    fn open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = EnvStore::open(dir.path().join(".env")).unwrap();
        assert_eq!(store.get("ANYTHING"), None);
    }

    #[test]
    fn staged_edits_are_invisible_on_disk_until_save() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, SAMPLE);
        store.set("MONGODB_PORT", "27018").unwrap();
        assert_eq!(store.get("MONGODB_PORT").as_deref(), Some("27018"));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), SAMPLE);

        store.save().unwrap();
        assert!(
            fs::read_to_string(store.path())
                .unwrap()
                .contains("MONGODB_PORT=27018\n")
        );
    }

    #[test]
    fn save_without_edits_reproduces_file_plus_backup() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, SAMPLE);
        let backup = store.save().unwrap().expect("backup expected");
        assert_eq!(fs::read_to_string(store.path()).unwrap(), SAMPLE);
        assert_eq!(fs::read_to_string(&backup).unwrap(), SAMPLE);
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(".env.backup_")
        );
    }

    #[test]
    fn invalid_value_is_rejected_at_stage_time() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, SAMPLE);
        let err = store.set("MONGODB_PORT", "70000").unwrap_err();
        assert!(matches!(err, EnvError::InvalidValue { .. }));
        assert_eq!(store.staged_count(), 0);
    }

    #[test]
    fn clear_keeps_the_record() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, SAMPLE);
        store.clear("CUSTOM_FLAG").unwrap();
        store.save().unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("CUSTOM_FLAG=\n"));
    }

    #[test]
    fn reset_stages_catalog_default() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, "MONGODB_PORT=5\n");
        let staged = store.reset("MONGODB_PORT").unwrap();
        assert_eq!(staged, "27017");
        assert_eq!(store.get("MONGODB_PORT").as_deref(), Some("27017"));
    }

    #[test]
    fn staging_the_saved_value_drops_the_edit() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, SAMPLE);
        store.set("MONGODB_PORT", "27018").unwrap();
        assert_eq!(store.staged_count(), 1);
        store.set("MONGODB_PORT", "27017").unwrap();
        assert_eq!(store.staged_count(), 0);
    }

    #[test]
    fn discard_drops_all_staged_edits() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, SAMPLE);
        store.set("NEW_KEY", "x").unwrap();
        store.clear("CUSTOM_FLAG").unwrap();
        store.discard();
        assert_eq!(store.staged_count(), 0);
        assert_eq!(store.get("NEW_KEY"), None);
    }

    #[test]
    fn import_backs_up_previous_file() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, SAMPLE);
        let backup = store.import("FRESH=1\n").unwrap().expect("backup expected");
        assert_eq!(fs::read_to_string(&backup).unwrap(), SAMPLE);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "FRESH=1\n");
        assert_eq!(store.get("FRESH").as_deref(), Some("1"));
        assert_eq!(store.get("CUSTOM_FLAG"), None);
    }

    #[test]
    fn variables_cover_catalog_and_custom_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, SAMPLE);
        store.set("STAGED_ONLY", "v").unwrap();
        let vars = store.variables();

        let dash = vars.iter().find(|v| v.name == "DASHSCOPE_API_KEY").unwrap();
        assert!(dash.sensitive);
        assert!(dash.is_set);
        assert_eq!(dash.category, Category::LlmKey);

        // catalog keys appear even when unset
        let redis = vars.iter().find(|v| v.name == "REDIS_URL").unwrap();
        assert!(!redis.is_set);

        let custom = vars.iter().find(|v| v.name == "CUSTOM_FLAG").unwrap();
        assert_eq!(custom.category, Category::Other);
        assert!(!custom.sensitive);

        let staged = vars.iter().find(|v| v.name == "STAGED_ONLY").unwrap();
        assert!(staged.staged);
    }

    #[test]
    fn reload_picks_up_external_changes_and_drops_staged() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, SAMPLE);
        store.set("MONGODB_PORT", "27018").unwrap();
        fs::write(store.path(), "MONGODB_HOST=db.internal\n").unwrap();
        store.reload().unwrap();
        assert_eq!(store.staged_count(), 0);
        assert_eq!(store.get("MONGODB_HOST").as_deref(), Some("db.internal"));
        assert_eq!(store.get("MONGODB_PORT"), None);
    }

    #[test]
    fn export_matches_saved_state() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, SAMPLE);
        store.set("MONGODB_PORT", "27018").unwrap();
        // staged edit not exported
        assert_eq!(store.export(), SAMPLE);
    }
}
