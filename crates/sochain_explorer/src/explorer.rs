//! Cache-checked block and transaction lookups: the surface callers use.

use crate::aggregate::{Aggregator, ResolveTransaction};
use crate::cache::{CacheKey, CachedRecord, RecordCache};
use crate::chain::{
    display_block, display_transaction, ChainSource, ClientError, DisplayBlock,
    DisplayTransaction, Network, SoChainClient, Upstream,
};
use crate::config::ExplorerConfig;
use crate::error::{status_message, ExplorerError};
use crate::telemetry::{LogEvent, LogSink, TracingSink};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::Level;

pub struct Explorer {
    source: Arc<dyn ChainSource>,
    cache: Arc<RecordCache>,
    transactions: Arc<CachedTransactions>,
    aggregator: Aggregator,
    max_txs: usize,
    sweeper: Option<JoinHandle<()>>,
    log: Arc<dyn LogSink>,
}

impl Explorer {
    /// Builds the explorer. Inside a tokio runtime this also starts the periodic expiry
    /// sweep, which stops when the explorer is dropped; outside one, expired entries are
    /// only dropped when read.
    pub fn new(
        config: &ExplorerConfig,
        source: Arc<dyn ChainSource>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let cache = Arc::new(RecordCache::new(&config.cache, Arc::clone(&log)));
        let transactions = Arc::new(CachedTransactions {
            source: Arc::clone(&source),
            cache: Arc::clone(&cache),
            log: Arc::clone(&log),
        });
        let aggregator = Aggregator::new(transactions.clone(), Arc::clone(&log));
        let sweeper = match Handle::try_current() {
            Ok(_) => Some(cache.spawn_sweeper(config.cache.sweep_interval)),
            Err(_) => {
                log.record(
                    Level::WARN,
                    LogEvent::new("no tokio runtime, background cache sweep disabled"),
                );
                None
            }
        };
        Self {
            source,
            cache,
            transactions,
            aggregator,
            max_txs: config.max_txs,
            sweeper,
            log,
        }
    }

    /// Explorer over the live SoChain API, logging through `tracing`.
    pub fn from_config(config: &ExplorerConfig) -> Result<Self, ClientError> {
        let client = SoChainClient::new(&config.base_url, config.timeout)?;
        Ok(Self::new(config, Arc::new(client), Arc::new(TracingSink)))
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub async fn block_display(
        &self,
        network: &str,
        block_no_or_hash: &str,
    ) -> Result<Arc<DisplayBlock>, ExplorerError> {
        let network = parse_network(network)?;
        validate_identifier(block_no_or_hash)?;

        let key = CacheKey::block(network, block_no_or_hash);
        let record = self
            .cache
            .get_or_fetch(&key, || async move {
                let result = self.source.get_block(network, block_no_or_hash).await;
                let raw = upstream(&*self.log, network, block_no_or_hash, result)?;
                let txs = self
                    .aggregator
                    .fetch_ordered(network, &raw.txs, self.max_txs)
                    .await;
                let failed = txs.iter().filter(|s| !s.is_ok()).count();
                let block = display_block(&raw, txs)?;
                let message = format!(
                    "block resolved, {} of {} txs failed",
                    failed,
                    raw.txs.len()
                );
                self.log.record(
                    Level::INFO,
                    LogEvent::new(&message)
                        .network(network)
                        .id(block_no_or_hash)
                        .count(block.txs.len()),
                );
                Ok::<_, ExplorerError>(CachedRecord::Block(Arc::new(block)))
            })
            .await?;

        match record {
            CachedRecord::Block(block) => Ok(block),
            CachedRecord::Transaction(_) => Err(ExplorerError::Decode(format!(
                "cache entry {} holds a transaction",
                key
            ))),
        }
    }

    pub async fn transaction_display(
        &self,
        network: &str,
        hash: &str,
    ) -> Result<Arc<DisplayTransaction>, ExplorerError> {
        let network = parse_network(network)?;
        validate_identifier(hash)?;
        self.transactions.resolve(network, hash).await
    }
}

/// Per-hash cache-or-fetch shared by the aggregator and direct transaction lookups.
struct CachedTransactions {
    source: Arc<dyn ChainSource>,
    cache: Arc<RecordCache>,
    log: Arc<dyn LogSink>,
}

#[async_trait]
impl ResolveTransaction for CachedTransactions {
    async fn resolve(
        &self,
        network: Network,
        hash: &str,
    ) -> Result<Arc<DisplayTransaction>, ExplorerError> {
        let key = CacheKey::transaction(network, hash);
        let record = self
            .cache
            .get_or_fetch(&key, || async move {
                let result = self.source.get_transaction(network, hash).await;
                let raw = upstream(&*self.log, network, hash, result)?;
                let tx = display_transaction(&raw)?;
                Ok::<_, ExplorerError>(CachedRecord::Transaction(Arc::new(tx)))
            })
            .await?;

        match record {
            CachedRecord::Transaction(tx) => Ok(tx),
            CachedRecord::Block(_) => Err(ExplorerError::Decode(format!(
                "cache entry {} holds a block",
                key
            ))),
        }
    }
}

fn parse_network(network: &str) -> Result<Network, ExplorerError> {
    network
        .parse::<Network>()
        .map_err(ExplorerError::UnsupportedNetwork)
}

/// Block numbers, block hashes and tx hashes are all non-empty ASCII alphanumerics.
fn validate_identifier(id: &str) -> Result<(), ExplorerError> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ExplorerError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

/// Unwraps a found record; every other outcome becomes a typed, logged error.
fn upstream<T>(
    log: &dyn LogSink,
    network: Network,
    id: &str,
    result: Result<Upstream<T>, ClientError>,
) -> Result<T, ExplorerError> {
    match result {
        Ok(Upstream::Found(raw)) => Ok(raw),
        Ok(Upstream::NotFound(message)) => Err(ExplorerError::NotFound {
            network: network.to_string(),
            id: id.to_string(),
            message,
        }),
        Ok(Upstream::Status { code, body }) => {
            log.record(
                Level::DEBUG,
                LogEvent::new("unexpected upstream status")
                    .network(network)
                    .id(id)
                    .status(code)
                    .error(&body),
            );
            Err(ExplorerError::UnexpectedStatus {
                status: code,
                message: status_message(code).to_string(),
            })
        }
        Err(e) => {
            log.record(
                Level::ERROR,
                LogEvent::new("provider call failed")
                    .network(network)
                    .id(id)
                    .error(&e.to_string()),
            );
            Err(ExplorerError::from_client(network.as_str(), id, e))
        }
    }
}

impl Drop for Explorer {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}
