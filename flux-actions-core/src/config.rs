//! Registry configuration

use crate::diagnostics::LogFilter;
use serde::{Deserialize, Serialize};

/// Environment variable holding the dispatch history capacity
pub const HISTORY_ENV: &str = "FLUX_ACTIONS_HISTORY";

/// Diagnostics settings for an [`ActionRegistry`](crate::ActionRegistry).
///
/// ```
/// use flux_actions_core::RegistryConfig;
///
/// let config = RegistryConfig::from_json(r#"{
///     "log": { "exclude": ["fetchNextDocuments"] },
///     "history": 50
/// }"#).unwrap();
/// assert!(!config.log.should_log("fetchNextDocuments"));
/// assert_eq!(config.history, Some(50));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Which actions emit pre-dispatch log lines
    pub log: LogFilter,
    /// Keep the last N log lines in memory; `None` disables the history
    pub history: Option<usize>,
}

impl RegistryConfig {
    /// Read `FLUX_ACTIONS_LOG` and `FLUX_ACTIONS_HISTORY`.
    ///
    /// An unparseable history capacity is logged and ignored.
    pub fn from_env() -> Self {
        let history = match std::env::var(HISTORY_ENV) {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(capacity) => Some(capacity),
                Err(err) => {
                    tracing::warn!(value = %raw, error = %err, "ignoring invalid {HISTORY_ENV}");
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            log: LogFilter::from_env(),
            history,
        }
    }

    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_log(mut self, log: LogFilter) -> Self {
        self.log = log;
        self
    }

    pub fn with_history(mut self, capacity: usize) -> Self {
        self.history = Some(capacity);
        self
    }
}
