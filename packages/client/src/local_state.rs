//! Client-local persisted state
//!
//! Holds the last accepted auth token and the panel split ratios. None of
//! it belongs to the document; a missing or unreadable file just means
//! defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sitefile_editor::{EditorError, ServiceResult};

pub const DEFAULT_STATE_NAME: &str = ".sitefile-state.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Site list / editor area widths, in percent
    #[serde(default = "default_main_split")]
    pub main_split: [f64; 2],

    /// Structured / text view widths, in percent
    #[serde(default = "default_editor_split")]
    pub editor_split: [f64; 2],
}

fn default_main_split() -> [f64; 2] {
    [20.0, 80.0]
}

fn default_editor_split() -> [f64; 2] {
    [50.0, 50.0]
}

impl Default for LocalState {
    fn default() -> Self {
        Self {
            auth_token: None,
            main_split: default_main_split(),
            editor_split: default_editor_split(),
        }
    }
}

impl LocalState {
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        serde_json::from_str(&content).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "Ignoring unreadable local state");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> ServiceResult<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|err| EditorError::Io(err.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|err| EditorError::Io(err.to_string()))?;
        std::fs::write(path, json).map_err(|err| EditorError::Io(err.to_string()))
    }

    pub fn clear_token(&mut self) {
        self.auth_token = None;
    }

    /// Load, change, write back
    pub fn update(path: &Path, change: impl FnOnce(&mut Self)) -> ServiceResult<Self> {
        let mut state = Self::load(path);
        change(&mut state);
        state.save(path)?;
        Ok(state)
    }
}
