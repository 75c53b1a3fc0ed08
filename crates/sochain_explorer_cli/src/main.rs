//! sochain-explorer CLI: look up a block or a transaction and print it as JSON.

use clap::{Args, Parser, Subcommand};
use sochain_explorer::{CacheConfig, Explorer, ExplorerConfig};
use std::time::Duration;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let cli = Cli::parse();
    let config = cli.provider.to_config();
    let rt = tokio::runtime::Runtime::new()?;
    // The explorer starts its cache sweeper on the ambient runtime.
    let _runtime = rt.enter();
    let explorer = Explorer::from_config(&config)?;
    match cli.command {
        Command::Block(args) => run_block(&rt, &explorer, args),
        Command::Tx(args) => run_tx(&rt, &explorer, args),
    }
}

#[derive(Parser)]
#[command(name = "sochain-explorer")]
#[command(about = "Block and transaction explorer over the SoChain API (BTC, LTC, DOGE)")]
struct Cli {
    #[command(flatten)]
    provider: ProviderArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a block and its first transactions, in block order.
    Block(BlockArgs),
    /// Show a single transaction.
    Tx(TxArgs),
}

#[derive(Args)]
struct ProviderArgs {
    #[arg(long, env = "SOCHAIN_BASE_URL", default_value = "https://sochain.com/api/v2")]
    base_url: String,
    #[arg(long, env = "SOCHAIN_TIMEOUT_SECS", default_value_t = 5)]
    timeout_secs: u64,
    /// Transactions resolved per block.
    #[arg(long, env = "SOCHAIN_MAX_TXS", default_value_t = 10)]
    max_txs: usize,
    #[arg(long, env = "SOCHAIN_CACHE_TTL_SECS", default_value_t = 3600)]
    cache_ttl_secs: u64,
    #[arg(
        long,
        env = "SOCHAIN_SWEEP_INTERVAL_SECS",
        default_value_t = 600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    sweep_interval_secs: u64,
}

impl ProviderArgs {
    fn to_config(&self) -> ExplorerConfig {
        ExplorerConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_txs: self.max_txs,
            cache: CacheConfig {
                ttl: Duration::from_secs(self.cache_ttl_secs),
                sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            },
        }
    }
}

#[derive(Args)]
struct BlockArgs {
    /// BTC, LTC or DOGE.
    network: String,
    /// Block number or block hash.
    block_no_or_hash: String,
}

#[derive(Args)]
struct TxArgs {
    /// BTC, LTC or DOGE.
    network: String,
    hash: String,
}

fn run_block(
    rt: &tokio::runtime::Runtime,
    explorer: &Explorer,
    args: BlockArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let block = rt.block_on(async {
        explorer
            .block_display(&args.network, &args.block_no_or_hash)
            .await
    })?;
    let failed = block.txs.iter().filter(|s| !s.is_ok()).count();
    info!(
        network = %args.network,
        block_no = block.block_no,
        txs = block.txs.len(),
        failed,
        "block lookup complete"
    );
    println!("{}", serde_json::to_string_pretty(&*block)?);
    Ok(())
}

fn run_tx(
    rt: &tokio::runtime::Runtime,
    explorer: &Explorer,
    args: TxArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let tx = rt.block_on(async { explorer.transaction_display(&args.network, &args.hash).await })?;
    info!(network = %args.network, txid = %tx.txid, "transaction lookup complete");
    println!("{}", serde_json::to_string_pretty(&*tx)?);
    Ok(())
}
