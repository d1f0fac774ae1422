use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing knobs of the synchronization controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Quiet period after the last keystroke before re-parsing
    pub debounce_ms: u64,

    /// Load, save, reload and the parse/generate calls
    pub request_timeout_secs: u64,

    /// Auxiliary list fetches (templates)
    pub aux_timeout_secs: u64,

    pub notice_ttl_ms: u64,

    /// Force-clear delay for a busy indicator whose guard never dropped
    pub busy_fallback_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            request_timeout_secs: 10,
            aux_timeout_secs: 5,
            notice_ttl_ms: 3000,
            busy_fallback_ms: 15000,
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn aux_timeout(&self) -> Duration {
        Duration::from_secs(self.aux_timeout_secs)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    pub fn busy_fallback(&self) -> Duration {
        Duration::from_millis(self.busy_fallback_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"debounceMs": 250}"#).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.aux_timeout(), Duration::from_secs(5));
    }
}
