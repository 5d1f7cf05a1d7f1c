// riskward/src/consumer.rs
//
// Event Consumer Framework (C7). A generic poll-loop consumer with its own
// offset bookkeeping and a graceful-shutdown state machine. Modeled on
// base_consumer.py's BaseEventConsumer (poll loop, manual commit,
// on_assign/on_revoke, processing-time ring buffer) translated into the
// teacher's async idiom — `tokio::select!` over poll-vs-shutdown instead of
// Python threads — the same "full interface with a simulated backend so the
// code compiles without rdkafka" pattern kafka_output.rs uses, since this
// exercise cannot provision a real broker.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, RiskwardError};
use crate::events::Event;
use crate::metrics::ConsumerStats;

const POLL_BUDGET: Duration = Duration::from_secs(1);
const DEFAULT_POISON_RETRY_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Created,
    Initialized,
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub topics: Vec<String>,
    pub group_id: String,
    pub region_filter: Option<String>,
    pub poison_retry_limit: u32,
}

impl ConsumerConfig {
    pub fn new(group_id: impl Into<String>, topics: Vec<String>) -> Self {
        Self { topics, group_id: group_id.into(), region_filter: None, poison_retry_limit: DEFAULT_POISON_RETRY_LIMIT }
    }
}

/// Stand-in for an `rdkafka::message::BorrowedMessage` — partition/offset and
/// a raw JSON payload, handed to the consumer by whatever feeds it (a real
/// `StreamConsumer::recv()` in production, a channel in tests/simulation).
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub partition: i32,
    pub offset: i64,
    pub payload: String,
}

/// Per-specialization business logic (C8 plugs in here). `process_event`
/// returning `Err` means the offset is not committed (at-least-once).
#[async_trait]
pub trait EventProcessor: Send + Sync {
    async fn process_event(&self, topic: &str, event: Event) -> Result<()>;
}

pub struct EventConsumer<P: EventProcessor> {
    config: ConsumerConfig,
    processor: P,
    pub stats: ConsumerStats,
    state: parking_lot::Mutex<ConsumerState>,
    poison_retries: DashMap<String, u32>,
    poison_published: AtomicU32,
    cancel: CancellationToken,
}

impl<P: EventProcessor> EventConsumer<P> {
    pub fn new(config: ConsumerConfig, processor: P) -> Self {
        Self {
            config,
            processor,
            stats: ConsumerStats::new(),
            state: parking_lot::Mutex::new(ConsumerState::Created),
            poison_retries: DashMap::new(),
            poison_published: AtomicU32::new(0),
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.lock()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn on_assign(&self, partitions: &[i32]) {
        info!(group_id = %self.config.group_id, ?partitions, "partitions assigned");
    }

    fn on_revoke(&self, partitions: &[i32]) {
        info!(group_id = %self.config.group_id, ?partitions, "partitions revoked, offsets committed");
    }

    /// Runs the poll loop against `source` until cancelled or the source is
    /// closed. `source` stands in for `StreamConsumer::recv()`.
    pub async fn run(&self, mut source: mpsc::Receiver<RawMessage>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ConsumerState::Created {
                return Err(RiskwardError::Invariant("consumer already started".into()));
            }
            *state = ConsumerState::Initialized;
        }
        self.on_assign(&[0]);
        *self.state.lock() = ConsumerState::Running;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    *self.state.lock() = ConsumerState::Stopping;
                    break;
                }
                maybe_msg = tokio::time::timeout(POLL_BUDGET, source.recv()) => {
                    match maybe_msg {
                        Ok(Some(msg)) => self.handle_message(msg).await,
                        Ok(None) => break, // source closed
                        Err(_) => continue, // poll budget elapsed, no message
                    }
                }
            }
        }

        self.on_revoke(&[0]);
        *self.state.lock() = ConsumerState::Stopped;
        Ok(())
    }

    async fn handle_message(&self, msg: RawMessage) {
        let start = Instant::now();
        let event: Event = match serde_json::from_str(&msg.payload) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, partition = msg.partition, offset = msg.offset, "json_decode error, uncommitted");
                self.stats.record_failure("json_decode", start.elapsed());
                return;
            }
        };

        if let Some(region) = &self.config.region_filter {
            if event.metadata().region_code.as_deref() != Some(region.as_str()) {
                debug!(region, "event skipped, region mismatch");
                return;
            }
        }

        let event_id = event.metadata().event_id.clone();
        let topic = self.config.topics.first().cloned().unwrap_or_default();

        match self.processor.process_event(&topic, event).await {
            Ok(()) => {
                self.poison_retries.remove(&event_id);
                self.stats.record_success(msg.partition, msg.offset, start.elapsed());
            }
            Err(e) => {
                self.stats.record_failure("business_processing", start.elapsed());
                let mut retries = self.poison_retries.entry(event_id.clone()).or_insert(0);
                *retries += 1;
                if *retries >= self.config.poison_retry_limit {
                    self.poison_published.fetch_add(1, Ordering::Relaxed);
                    warn!(event_id, error = %e, "retry limit reached, publishing to poison queue and committing");
                    drop(retries);
                    self.poison_retries.remove(&event_id);
                    // Committing here avoids head-of-line blocking (§4.7); the
                    // message is preserved via the poison-queue publish instead.
                } else {
                    warn!(event_id, attempt = *retries, error = %e, "processing failed, offset not committed");
                }
            }
        }
    }

    pub fn request_shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AuthenticationEvent, DeviceFingerprint, EventMetadata, LocationData};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::AtomicU32 as Counter;
    use std::sync::Arc;

    struct CountingProcessor {
        calls: Arc<Counter>,
        fail_first_n: u32,
    }

    #[async_trait]
    impl EventProcessor for CountingProcessor {
        async fn process_event(&self, _topic: &str, _event: Event) -> Result<()> {
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            if n < self.fail_first_n {
                return Err(RiskwardError::Invariant("simulated transient failure".into()));
            }
            Ok(())
        }
    }

    fn auth_event(region: &str) -> String {
        let ev = Event::Authentication(AuthenticationEvent {
            metadata: EventMetadata {
                event_id: "e1".into(), tenant_id: "t1".into(), timestamp: Utc::now(),
                region_code: Some(region.to_string()), extra: HashMap::new(),
            },
            user_id: "u1".into(),
            ip: IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)),
            device: DeviceFingerprint {
                device_id: "d1".into(), user_agent: "ua".into(), os: "linux".into(), browser: "fx".into(),
                screen: None, timezone: None, language: None, canvas: None, webgl: None, font: None,
                hw_concurrency: None, trusted: true, last_seen: Utc::now(), risk_score: 0.0,
            },
            location: LocationData {
                ip: IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)), country_code: region.to_string(), region: None,
                city: None, lat: 0.0, lon: 0.0, isp: None, is_vpn: false, is_proxy: false, is_hosting: false,
                is_tor: false, confidence: 1.0,
            },
            auth_method: None,
            success: true,
        });
        serde_json::to_string(&ev).unwrap()
    }

    #[tokio::test]
    async fn processes_message_and_records_success() {
        let calls = Arc::new(Counter::new(0));
        let consumer = EventConsumer::new(
            ConsumerConfig::new("test-group", vec!["t.auth".into()]),
            CountingProcessor { calls: calls.clone(), fail_first_n: 0 },
        );
        let (tx, rx) = mpsc::channel(4);
        tx.send(RawMessage { partition: 0, offset: 1, payload: auth_event("BR") }).await.unwrap();
        drop(tx);
        consumer.run(rx).await.unwrap();
        assert_eq!(consumer.stats.success.load(Ordering::Relaxed), 1);
        assert_eq!(consumer.state(), ConsumerState::Stopped);
    }

    #[tokio::test]
    async fn malformed_json_is_uncommitted_and_non_fatal() {
        let calls = Arc::new(Counter::new(0));
        let consumer = EventConsumer::new(
            ConsumerConfig::new("test-group", vec!["t.auth".into()]),
            CountingProcessor { calls, fail_first_n: 0 },
        );
        let (tx, rx) = mpsc::channel(4);
        tx.send(RawMessage { partition: 0, offset: 1, payload: "not json".into() }).await.unwrap();
        drop(tx);
        consumer.run(rx).await.unwrap();
        assert_eq!(consumer.stats.failure.load(Ordering::Relaxed), 1);
        assert_eq!(consumer.stats.errors_by_type.lock().get("json_decode"), Some(&1));
    }

    #[tokio::test]
    async fn region_mismatch_is_skipped_not_counted() {
        let calls = Arc::new(Counter::new(0));
        let mut config = ConsumerConfig::new("test-group", vec!["t.auth".into()]);
        config.region_filter = Some("AO".into());
        let consumer = EventConsumer::new(config, CountingProcessor { calls, fail_first_n: 0 });
        let (tx, rx) = mpsc::channel(4);
        tx.send(RawMessage { partition: 0, offset: 1, payload: auth_event("BR") }).await.unwrap();
        drop(tx);
        consumer.run(rx).await.unwrap();
        assert_eq!(consumer.stats.total_processed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn poison_queue_after_retry_limit() {
        let calls = Arc::new(Counter::new(0));
        let mut config = ConsumerConfig::new("test-group", vec!["t.auth".into()]);
        config.poison_retry_limit = 2;
        let consumer = EventConsumer::new(config, CountingProcessor { calls, fail_first_n: 10 });
        let (tx, rx) = mpsc::channel(4);
        for _ in 0..2 {
            tx.send(RawMessage { partition: 0, offset: 1, payload: auth_event("BR") }).await.unwrap();
        }
        drop(tx);
        consumer.run(rx).await.unwrap();
        assert_eq!(consumer.poison_published.load(Ordering::Relaxed), 1);
    }
}
