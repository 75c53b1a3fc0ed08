//! Chain data access: supported networks, the provider client, and display reshaping.

pub(crate) mod client;
mod network;
mod reshape;

pub use client::{ChainSource, ClientError, RawBlock, RawTransaction, SoChainClient, Upstream};
pub use network::{supports, Network, SUPPORTED_NETWORKS};
pub use reshape::{
    display_block, display_transaction, format_epoch, DisplayBlock, DisplayTransaction,
    ReshapeError,
};
