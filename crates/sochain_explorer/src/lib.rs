//! sochain_explorer — block and transaction explorer over the SoChain API.
//!
//! Fetches a block, resolves its transactions concurrently in block order, reshapes both
//! into display records and memoizes them in a TTL cache.

pub mod aggregate;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod explorer;
pub mod telemetry;

pub use aggregate::{Aggregator, SlotStatus, TxSlot};
pub use cache::{CacheConfig, CacheKey, CachedRecord, RecordCache};
pub use chain::{
    ChainSource, DisplayBlock, DisplayTransaction, Network, RawBlock, RawTransaction,
    SoChainClient, Upstream,
};
pub use config::ExplorerConfig;
pub use error::{ErrorClass, ExplorerError};
pub use explorer::Explorer;
pub use telemetry::{LogEvent, LogSink, NoopSink, TracingSink};
