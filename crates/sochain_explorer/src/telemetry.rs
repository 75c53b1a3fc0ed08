//! Injected logging capability.
//!
//! Components take an `Arc<dyn LogSink>` at construction instead of logging through a
//! process-wide handle, so tests can swap in a no-op or recording sink.

use crate::chain::Network;
use tracing::Level;

/// One log event with its structured fields. Unset fields are left off the record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogEvent<'a> {
    pub message: &'a str,
    pub network: Option<Network>,
    pub id: Option<&'a str>,
    pub status: Option<u16>,
    pub count: Option<usize>,
    pub error: Option<&'a str>,
}

impl<'a> LogEvent<'a> {
    pub fn new(message: &'a str) -> Self {
        Self {
            message,
            ..Default::default()
        }
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn error(mut self, error: &'a str) -> Self {
        self.error = Some(error);
        self
    }
}

pub trait LogSink: Send + Sync {
    fn record(&self, level: Level, event: LogEvent<'_>);
}

/// Forwards to the current `tracing` subscriber, one field per set event field.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

macro_rules! emit {
    ($macro:ident, $event:expr) => {
        tracing::$macro!(
            network = $event.network.map(|n| n.as_str()),
            id = $event.id,
            status = $event.status,
            count = $event.count,
            error = $event.error,
            "{}",
            $event.message
        )
    };
}

impl LogSink for TracingSink {
    fn record(&self, level: Level, event: LogEvent<'_>) {
        match level {
            Level::ERROR => emit!(error, event),
            Level::WARN => emit!(warn, event),
            Level::INFO => emit!(info, event),
            Level::DEBUG => emit!(debug, event),
            _ => emit!(trace, event),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn record(&self, _level: Level, _event: LogEvent<'_>) {}
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn builder_sets_only_named_fields() {
        let event = LogEvent::new("cache miss")
            .network(Network::Ltc)
            .id("42");
        assert_eq!(event.network, Some(Network::Ltc));
        assert_eq!(event.id, Some("42"));
        assert_eq!(event.status, None);
        assert_eq!(event.error, None);
    }

    #[test]
    fn tracing_sink_accepts_every_level() {
        let event = LogEvent::new("provider call failed")
            .network(Network::Btc)
            .id("abc")
            .status(500)
            .error("timeout");
        for level in [
            Level::ERROR,
            Level::WARN,
            Level::INFO,
            Level::DEBUG,
            Level::TRACE,
        ] {
            TracingSink.record(level, event);
        }
    }

    #[test]
    fn recording_sink_keeps_fields() {
        let sink = RecordingSink::default();
        sink.record(
            Level::WARN,
            LogEvent::new("transaction degraded")
                .network(Network::Doge)
                .id("h3")
                .error("boom"),
        );
        let warned = sink.events_at(Level::WARN);
        assert_eq!(warned.len(), 1);
        assert_eq!(warned[0].network, Some(Network::Doge));
        assert_eq!(warned[0].id.as_deref(), Some("h3"));
        assert_eq!(warned[0].error.as_deref(), Some("boom"));
        assert!(sink.events_at(Level::INFO).is_empty());
    }
}
