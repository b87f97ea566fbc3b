use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{PatternStore, StoreError};

/// File-backed store: one JSON document per scope under a base directory.
/// Scope keys are sanitized into filenames, so `bigquery/my-project` and
/// `bigquery_my-project` collide; scopes are caller-chosen identifiers, not
/// arbitrary text.
pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(JsonFileStore { base_dir })
    }

    fn scope_path(&self, scope: &str) -> PathBuf {
        let sanitized: String = scope
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_dir.join(format!("{}.json", sanitized))
    }
}

impl PatternStore for JsonFileStore {
    fn save_summaries(&self, scope: &str, summaries: &[Value]) -> Result<(), StoreError> {
        let path = self.scope_path(scope);
        let body = serde_json::to_string_pretty(summaries)?;
        // Write-then-rename so readers never observe a partial document.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load_summaries(&self, scope: &str) -> Result<Vec<Value>, StoreError> {
        let path = self.scope_path(scope);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let body = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn list_scopes(&self) -> Result<Vec<String>, StoreError> {
        let mut scopes = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    scopes.push(stem.to_string());
                }
            }
        }
        scopes.sort();
        Ok(scopes)
    }
}
