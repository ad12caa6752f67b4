//! Connection tuning for [`FeatureStore`](crate::FeatureStore).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Statements compiled into the cache when a store opens.
pub(crate) const STORE_STATEMENT_COUNT: usize = 4;

const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 16;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Settings applied to the SQLite connection when a store opens.
///
/// Missing fields fall back to their defaults when deserialised.
///
/// # Examples
/// ```
/// use geofeature_store::FeatureStoreConfig;
///
/// let config: FeatureStoreConfig =
///     serde_json::from_str(r#"{ "busy_timeout_ms": 250 }"#).expect("parse config");
/// assert_eq!(config.busy_timeout_ms, 250);
/// assert_eq!(
///     config.statement_cache_capacity,
///     FeatureStoreConfig::default().statement_cache_capacity
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureStoreConfig {
    /// Capacity of the connection's prepared-statement cache.
    pub statement_cache_capacity: usize,
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl FeatureStoreConfig {
    /// Cache capacity actually applied, never below the number of insert
    /// statements the store keeps compiled.
    pub fn effective_cache_capacity(&self) -> usize {
        self.statement_cache_capacity.max(STORE_STATEMENT_COUNT)
    }

    /// Busy timeout as a [`Duration`].
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for FeatureStoreConfig {
    fn default() -> Self {
        Self {
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, STORE_STATEMENT_COUNT)]
    #[case(STORE_STATEMENT_COUNT, STORE_STATEMENT_COUNT)]
    #[case(64, 64)]
    fn cache_capacity_is_clamped(#[case] requested: usize, #[case] expected: usize) {
        let config = FeatureStoreConfig {
            statement_cache_capacity: requested,
            ..FeatureStoreConfig::default()
        };
        assert_eq!(config.effective_cache_capacity(), expected);
    }

    #[rstest]
    fn empty_document_yields_defaults() {
        let config: FeatureStoreConfig = serde_json::from_str("{}").expect("parse config");
        assert_eq!(config, FeatureStoreConfig::default());
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
    }
}
