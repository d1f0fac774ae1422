use serde::{Deserialize, Serialize};
use sitefile_client::DEFAULT_STATE_NAME;
use sitefile_editor::SyncConfig;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "sitefile.config.json";

/// Sitefile configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the site file service
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Spaces per nesting level when formatting locally
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Where the auth token and panel splits are kept
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Debounce window and timeouts
    #[serde(flatten)]
    pub sync: SyncConfig,
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_indent() -> usize {
    4
}

fn default_state_file() -> String {
    DEFAULT_STATE_NAME.to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Absolute path of the local state file
    pub fn get_state_path(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.state_file)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            indent: default_indent(),
            state_file: default_state_file(),
            sync: SyncConfig::default(),
        }
    }
}
