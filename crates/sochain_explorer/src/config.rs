//! Explorer configuration.

use crate::cache::CacheConfig;
use crate::chain::client::{DEFAULT_SOCHAIN_URL, DEFAULT_TIMEOUT};
use std::time::Duration;

/// Transactions resolved per block unless configured otherwise.
pub const DEFAULT_MAX_TXS: usize = 10;

#[derive(Clone, Debug)]
pub struct ExplorerConfig {
    pub base_url: String,
    /// Per-request client timeout.
    pub timeout: Duration,
    /// Upper bound on transactions resolved per block.
    pub max_txs: usize,
    pub cache: CacheConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOCHAIN_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_txs: DEFAULT_MAX_TXS,
            cache: CacheConfig::default(),
        }
    }
}
