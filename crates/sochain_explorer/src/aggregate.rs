//! Concurrent, order-preserving resolution of a block's transactions.
//!
//! One task per hash is spawned into a [`JoinSet`] before anything is awaited. Every task
//! yields exactly one slot: a failed lookup becomes a degraded slot inside the task, and a
//! task that panics or is aborted is filled with a degraded slot after the join. Output
//! position `i` always holds the result for input hash `i`.

use crate::chain::{DisplayTransaction, Network};
use crate::error::ExplorerError;
use crate::telemetry::{LogEvent, LogSink};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::Level;

/// Cache-or-fetch lookup of one display transaction.
#[async_trait]
pub trait ResolveTransaction: Send + Sync {
    async fn resolve(
        &self,
        network: Network,
        hash: &str,
    ) -> Result<Arc<DisplayTransaction>, ExplorerError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Ok,
    Failed,
}

/// One position of a block's transaction list.
///
/// A failed slot keeps the hash in `txid`, leaves every other field empty and says why in
/// `error`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TxSlot {
    pub status: SlotStatus,
    #[serde(flatten)]
    pub tx: DisplayTransaction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TxSlot {
    pub fn ok(tx: DisplayTransaction) -> Self {
        Self {
            status: SlotStatus::Ok,
            tx,
            error: None,
        }
    }

    pub fn degraded(hash: &str, error: impl Into<String>) -> Self {
        Self {
            status: SlotStatus::Failed,
            tx: DisplayTransaction {
                txid: hash.to_string(),
                ..Default::default()
            },
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SlotStatus::Ok
    }
}

pub struct Aggregator {
    resolver: Arc<dyn ResolveTransaction>,
    log: Arc<dyn LogSink>,
}

impl Aggregator {
    pub fn new(resolver: Arc<dyn ResolveTransaction>, log: Arc<dyn LogSink>) -> Self {
        Self { resolver, log }
    }

    /// Resolves the first `bound` of `hashes` concurrently and returns them in input order.
    pub async fn fetch_ordered(
        &self,
        network: Network,
        hashes: &[String],
        bound: usize,
    ) -> Vec<TxSlot> {
        let dispatched = &hashes[..hashes.len().min(bound)];
        if dispatched.is_empty() {
            return Vec::new();
        }

        let mut tasks = JoinSet::new();
        for (index, hash) in dispatched.iter().enumerate() {
            let resolver = Arc::clone(&self.resolver);
            let log = Arc::clone(&self.log);
            let hash = hash.clone();
            tasks.spawn(async move {
                let slot = match resolver.resolve(network, &hash).await {
                    Ok(tx) => TxSlot::ok((*tx).clone()),
                    Err(e) => {
                        let error = e.to_string();
                        log.record(
                            Level::WARN,
                            LogEvent::new("transaction degraded")
                                .network(network)
                                .id(&hash)
                                .error(&error),
                        );
                        TxSlot::degraded(&hash, error)
                    }
                };
                (index, slot)
            });
        }

        let mut slots: Vec<Option<TxSlot>> = vec![None; dispatched.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, slot)) => slots[index] = Some(slot),
                Err(e) => self.log.record(
                    Level::ERROR,
                    LogEvent::new("transaction task did not complete")
                        .network(network)
                        .error(&e.to_string()),
                ),
            }
        }

        slots
            .into_iter()
            .zip(dispatched)
            .map(|(slot, hash)| {
                slot.unwrap_or_else(|| TxSlot::degraded(hash, "transaction task did not complete"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::testing::RecordingSink;
    use crate::telemetry::NoopSink;
    use rand::Rng;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers after a per-hash delay; hashes listed in `fail` error, in `panic` panic.
    #[derive(Default)]
    struct StubResolver {
        delays_ms: HashMap<String, u64>,
        fail: Vec<String>,
        panic: Vec<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResolveTransaction for StubResolver {
        async fn resolve(
            &self,
            _network: Network,
            hash: &str,
        ) -> Result<Arc<DisplayTransaction>, ExplorerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ms = self.delays_ms.get(hash).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            if self.panic.iter().any(|h| h == hash) {
                panic!("resolver blew up on {}", hash);
            }
            if self.fail.iter().any(|h| h == hash) {
                return Err(ExplorerError::UnexpectedStatus {
                    status: 500,
                    message: "upstream down".into(),
                });
            }
            Ok(Arc::new(DisplayTransaction {
                txid: hash.to_string(),
                time: "09/22/2012 13:45".into(),
                fee: "0.0001".into(),
                sent_value: "1.0".into(),
            }))
        }
    }

    fn hashes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("h{}", i)).collect()
    }

    fn aggregator(resolver: Arc<StubResolver>) -> Aggregator {
        Aggregator::new(resolver, Arc::new(NoopSink))
    }

    fn txids(slots: &[TxSlot]) -> Vec<String> {
        slots.iter().map(|s| s.tx.txid.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn order_survives_random_completion() {
        let mut rng = rand::rng();
        for _ in 0..25 {
            let input = hashes(12);
            let delays_ms: HashMap<String, u64> = input
                .iter()
                .map(|h| (h.clone(), rng.random_range(0..200)))
                .collect();
            let resolver = Arc::new(StubResolver {
                delays_ms,
                ..Default::default()
            });
            let out = aggregator(resolver)
                .fetch_ordered(Network::Btc, &input, 12)
                .await;
            assert_eq!(txids(&out), input);
            assert!(out.iter().all(TxSlot::is_ok));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reverse_latency_still_in_order() {
        let input = hashes(5);
        let delays_ms: HashMap<String, u64> = input
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), (5 - i as u64) * 100))
            .collect();
        let resolver = Arc::new(StubResolver {
            delays_ms,
            ..Default::default()
        });
        let out = aggregator(resolver)
            .fetch_ordered(Network::Ltc, &input, 10)
            .await;
        assert_eq!(txids(&out), input);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn order_survives_completion_on_worker_threads() {
        for _ in 0..20 {
            let input = hashes(24);
            let delays_ms: HashMap<String, u64> = {
                let mut rng = rand::rng();
                input
                    .iter()
                    .map(|h| (h.clone(), rng.random_range(0..15)))
                    .collect()
            };
            let resolver = Arc::new(StubResolver {
                delays_ms,
                ..Default::default()
            });
            let out = aggregator(Arc::clone(&resolver))
                .fetch_ordered(Network::Btc, &input, 24)
                .await;
            assert_eq!(txids(&out), input);
            assert!(out.iter().all(TxSlot::is_ok));
            assert_eq!(resolver.calls.load(Ordering::SeqCst), 24);
        }
    }

    #[tokio::test]
    async fn bound_truncates_without_reordering() {
        let input = hashes(15);
        let resolver = Arc::new(StubResolver::default());
        let out = aggregator(Arc::clone(&resolver))
            .fetch_ordered(Network::Btc, &input, 10)
            .await;
        assert_eq!(txids(&out), input[..10].to_vec());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn empty_input_dispatches_nothing() {
        let resolver = Arc::new(StubResolver::default());
        let out = aggregator(Arc::clone(&resolver))
            .fetch_ordered(Network::Btc, &[], 10)
            .await;
        assert!(out.is_empty());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_bound_dispatches_nothing() {
        let resolver = Arc::new(StubResolver::default());
        let out = aggregator(Arc::clone(&resolver))
            .fetch_ordered(Network::Btc, &hashes(3), 0)
            .await;
        assert!(out.is_empty());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_lookup_degrades_only_its_slot() {
        let input = hashes(6);
        let resolver = Arc::new(StubResolver {
            fail: vec!["h3".into()],
            ..Default::default()
        });
        let sink = Arc::new(RecordingSink::default());
        let out = Aggregator::new(resolver, sink.clone())
            .fetch_ordered(Network::Doge, &input, 10)
            .await;
        assert_eq!(out.len(), 6);
        assert_eq!(txids(&out), input);
        for (i, slot) in out.iter().enumerate() {
            if i == 3 {
                assert_eq!(slot.status, SlotStatus::Failed);
                assert_eq!(slot.tx.time, "");
                assert_eq!(slot.tx.fee, "");
                assert_eq!(slot.tx.sent_value, "");
                assert!(slot.error.is_some());
            } else {
                assert!(slot.is_ok());
            }
        }
        let warnings = sink.events_at(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].network, Some(Network::Doge));
        assert_eq!(warnings[0].id.as_deref(), Some("h3"));
        assert!(warnings[0].error.is_some());
    }

    #[tokio::test]
    async fn panicking_task_still_fills_its_slot() {
        let input = hashes(4);
        let resolver = Arc::new(StubResolver {
            panic: vec!["h1".into()],
            ..Default::default()
        });
        let out = aggregator(resolver)
            .fetch_ordered(Network::Btc, &input, 10)
            .await;
        assert_eq!(txids(&out), input);
        assert_eq!(out[1].status, SlotStatus::Failed);
        assert!(out[0].is_ok() && out[2].is_ok() && out[3].is_ok());
    }

    #[test]
    fn slot_json_carries_status_tag() {
        let failed = serde_json::to_value(TxSlot::degraded("h9", "boom")).unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["txid"], "h9");
        assert_eq!(failed["fee"], "");
        assert_eq!(failed["error"], "boom");

        let ok = serde_json::to_value(TxSlot::ok(DisplayTransaction {
            txid: "h0".into(),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(ok["status"], "ok");
        assert!(ok.get("error").is_none());
    }
}
