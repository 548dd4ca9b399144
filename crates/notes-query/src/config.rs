//! Engine settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::optimizer::DEFAULT_INDEX_THRESHOLD;

const DEFAULT_CACHE_TTL_MS: u64 = 5 * 60 * 1000;
const DEFAULT_MAX_CACHE_SIZE: usize = 100;
const DEFAULT_MAX_EXECUTION_TIME_MS: u64 = 5000;

/// Settings for a [`QueryEngine`](crate::QueryEngine).
///
/// Every field has a default, so a partial TOML or JSON table deserializes.
///
/// ```
/// use notes_query_rs::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(r#"{"max_cache_size": 10}"#).unwrap();
/// assert_eq!(config.max_cache_size, 10);
/// assert!(config.enable_cache);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cache query results.
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// How long a cached result stays valid, in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Maximum number of cached results.
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Compute query plans.
    #[serde(default = "default_true")]
    pub enable_optimization: bool,

    /// Collection size above which the optimizer suggests indexes.
    #[serde(default = "default_index_threshold")]
    pub index_threshold: usize,

    /// Execution time after which a query is reported as slow, in milliseconds.
    #[serde(default = "default_max_execution_time_ms")]
    pub max_execution_time_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_ms() -> u64 {
    DEFAULT_CACHE_TTL_MS
}

fn default_max_cache_size() -> usize {
    DEFAULT_MAX_CACHE_SIZE
}

fn default_index_threshold() -> usize {
    DEFAULT_INDEX_THRESHOLD
}

fn default_max_execution_time_ms() -> u64 {
    DEFAULT_MAX_EXECUTION_TIME_MS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            enable_optimization: true,
            index_threshold: DEFAULT_INDEX_THRESHOLD,
            max_execution_time_ms: DEFAULT_MAX_EXECUTION_TIME_MS,
        }
    }
}

impl EngineConfig {
    /// The cache TTL as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// The slow-query threshold as a [`Duration`].
    pub fn max_execution_time(&self) -> Duration {
        Duration::from_millis(self.max_execution_time_ms)
    }
}
