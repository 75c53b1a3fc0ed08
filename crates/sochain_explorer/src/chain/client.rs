//! SoChain API client. One GET per lookup, fixed timeout, no retries.

use crate::chain::network::Network;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_SOCHAIN_URL: &str = "https://sochain.com/api/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const STATUS_SUCCESS: &str = "success";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Outcome of a lookup that reached the provider.
#[derive(Clone, Debug, PartialEq)]
pub enum Upstream<T> {
    Found(T),
    /// Provider says the identifier does not exist; carries its message.
    NotFound(String),
    /// Any other non-success HTTP status.
    Status { code: u16, body: String },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RawBlock {
    pub network: String,
    pub block_no: u64,
    /// Epoch seconds.
    pub time: i64,
    #[serde(default)]
    pub previous_blockhash: Option<String>,
    #[serde(default)]
    pub next_blockhash: Option<String>,
    pub size: u64,
    #[serde(default)]
    pub txs: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RawTransaction {
    pub txid: String,
    /// Epoch seconds.
    pub time: i64,
    pub fee: String,
    pub sent_value: String,
}

#[derive(Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Remote source of raw block and transaction records.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn get_block(
        &self,
        network: Network,
        block_no_or_hash: &str,
    ) -> Result<Upstream<RawBlock>, ClientError>;

    async fn get_transaction(
        &self,
        network: Network,
        hash: &str,
    ) -> Result<Upstream<RawTransaction>, ClientError>;
}

pub struct SoChainClient {
    base_url: String,
    client: reqwest::Client,
    request_count: AtomicU64,
}

impl SoChainClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)?;
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            client,
            request_count: AtomicU64::new(0),
        })
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    fn url(&self, endpoint: &str, network: Network, id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url,
            endpoint,
            network,
            urlencoding::encode(id)
        )
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<Upstream<T>, ClientError> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let res = self.client.get(url).send().await.map_err(|e| {
            warn!(%url, error = %e, "provider request failed");
            e
        })?;
        let status = res.status();
        let body = res.text().await?;

        if status == StatusCode::OK {
            let envelope: Envelope = serde_json::from_str(&body)?;
            if envelope.status == STATUS_SUCCESS {
                return Ok(Upstream::Found(serde_json::from_value(envelope.data)?));
            }
            debug!(%url, status = %envelope.status, "provider reported failure");
            return Ok(Upstream::NotFound(fail_message(&envelope.data, &body)));
        }

        debug!(%url, status = status.as_u16(), %body, "unexpected provider response");
        if status == StatusCode::NOT_FOUND {
            let message = serde_json::from_str::<Envelope>(&body)
                .map(|e| fail_message(&e.data, &body))
                .unwrap_or(body);
            return Ok(Upstream::NotFound(message));
        }
        Ok(Upstream::Status {
            code: status.as_u16(),
            body,
        })
    }
}

/// SoChain puts the reason for a `fail` status in `data.blockid` / `data.txid`.
fn fail_message(data: &serde_json::Value, body: &str) -> String {
    ["blockid", "txid"]
        .iter()
        .find_map(|k| data.get(*k).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl ChainSource for SoChainClient {
    async fn get_block(
        &self,
        network: Network,
        block_no_or_hash: &str,
    ) -> Result<Upstream<RawBlock>, ClientError> {
        let url = self.url("get_block", network, block_no_or_hash);
        self.get(&url).await
    }

    async fn get_transaction(
        &self,
        network: Network,
        hash: &str,
    ) -> Result<Upstream<RawTransaction>, ClientError> {
        let url = self.url("tx", network, hash);
        self.get(&url).await
    }
}
