// riskward/src/metrics.rs
//
// Ambient counters exposed to observability (§4.7, §4.9, §7). Atomic
// counters rather than a mutex-guarded struct, the same style load_shedder.rs
// uses for its shed/accepted tallies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

/// Rolling window of the last N processing times, for p50/p90-style reporting
/// without keeping unbounded history.
pub struct ProcessingTimes {
    capacity: usize,
    samples: Mutex<std::collections::VecDeque<Duration>>,
}

impl ProcessingTimes {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, samples: Mutex::new(std::collections::VecDeque::with_capacity(capacity)) }
    }

    pub fn record(&self, d: Duration) {
        let mut samples = self.samples.lock();
        if samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(d);
    }

    pub fn avg(&self) -> Duration {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = samples.iter().sum();
        total / samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples.lock().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.samples.lock().iter().copied().min().unwrap_or(Duration::ZERO)
    }
}

/// C7 per-consumer counters (§4.7 "Metrics (contract to observability)").
pub struct ConsumerStats {
    pub total_processed: AtomicU64,
    pub success: AtomicU64,
    pub failure: AtomicU64,
    pub errors_by_type: Mutex<HashMap<String, u64>>,
    pub last_offset_by_partition: Mutex<HashMap<i32, i64>>,
    pub processing_times: ProcessingTimes,
}

impl ConsumerStats {
    pub fn new() -> Self {
        Self {
            total_processed: AtomicU64::new(0),
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
            errors_by_type: Mutex::new(HashMap::new()),
            last_offset_by_partition: Mutex::new(HashMap::new()),
            processing_times: ProcessingTimes::new(100),
        }
    }

    pub fn record_success(&self, partition: i32, offset: i64, elapsed: Duration) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        self.success.fetch_add(1, Ordering::Relaxed);
        self.last_offset_by_partition.lock().insert(partition, offset);
        self.processing_times.record(elapsed);
    }

    pub fn record_failure(&self, error_kind: &str, elapsed: Duration) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        self.failure.fetch_add(1, Ordering::Relaxed);
        *self.errors_by_type.lock().entry(error_kind.to_string()).or_insert(0) += 1;
        self.processing_times.record(elapsed);
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total_processed.load(Ordering::Relaxed);
        if total == 0 {
            return 1.0;
        }
        self.success.load(Ordering::Relaxed) as f64 / total as f64
    }
}

impl Default for ConsumerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// C9 notifier counters.
#[derive(Default)]
pub struct NotifierStats {
    pub dispatched: AtomicU64,
    pub suppressed_cooldown: AtomicU64,
    pub retried: AtomicU64,
    pub exhausted: AtomicU64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumer_stats_track_success_and_failure() {
        let stats = ConsumerStats::new();
        stats.record_success(0, 10, Duration::from_millis(5));
        stats.record_failure("json_decode", Duration::from_millis(1));
        assert_eq!(stats.total_processed.load(Ordering::Relaxed), 2);
        assert_eq!(stats.errors_by_type.lock().get("json_decode"), Some(&1));
        assert!((stats.success_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn processing_times_bounded_by_capacity() {
        let times = ProcessingTimes::new(3);
        for ms in [1, 2, 3, 4] {
            times.record(Duration::from_millis(ms));
        }
        assert_eq!(times.samples.lock().len(), 3);
        assert_eq!(times.min(), Duration::from_millis(2));
        assert_eq!(times.max(), Duration::from_millis(4));
    }
}
