//! Collective-hint bag.
//!
//! Hints are opaque key→value strings handed to the container driver's access
//! properties before create/open, the way an info object rides along with a
//! parallel file-access property list. The engine never interprets them; a
//! driver picks out the keys it understands and ignores the rest.
//!
//! Besides programmatic `set`, a bag can be loaded from an `esio.toml` with a
//! `[hints]` table. Absent file or parse failure falls back to the empty bag;
//! hint files tune behavior and must never be able to fail a run.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Deserialize, Default, Clone)]
struct HintsFile {
    #[serde(default)]
    hints: BTreeMap<String, String>,
}

/// Opaque key→value hint bag attached to a handle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Hints {
    entries: BTreeMap<String, String>,
}

/// Best-effort hint-file path: local `esio.toml` first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("esio.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("esio").join("esio.toml");
    }
    PathBuf::from("esio.toml")
}

impl Hints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a hint bag from `path` (or the discovered default). Missing file
    /// and malformed content both yield the empty bag.
    pub fn load_from(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(discover);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match toml::from_str::<HintsFile>(&content) {
            Ok(file) => {
                info!(
                    target: "comm",
                    path = %path.display(),
                    count = file.hints.len(),
                    "hints_loaded"
                );
                Self {
                    entries: file.hints,
                }
            }
            Err(_e) => Self::default(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
