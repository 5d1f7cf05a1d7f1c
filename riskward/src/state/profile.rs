// riskward/src/state/profile.rs
//
// Per-user behavioural profile and recent-event memory (spec §3). Top-K
// lists are frequency-ordered with ties broken by most-recent `last_seen`,
// matching the teacher's reverse-index bookkeeping in its old state store
// but scoped per user instead of per cluster.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;

/// A bounded, frequency-ordered list (LRU-by-frequency; ties broken by most
/// recent `last_seen`). Used for `usual_locations` and `usual_devices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopKList {
    capacity: usize,
    entries: Vec<TopKEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopKEntry {
    pub key: String,
    pub frequency: u64,
    pub last_seen: DateTime<Utc>,
}

impl TopKList {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: Vec::with_capacity(capacity) }
    }

    pub fn record(&mut self, key: &str, now: DateTime<Utc>) {
        if let Some(e) = self.entries.iter_mut().find(|e| e.key == key) {
            e.frequency += 1;
            e.last_seen = now;
        } else if self.entries.len() < self.capacity {
            self.entries.push(TopKEntry { key: key.to_string(), frequency: 1, last_seen: now });
        } else {
            // Evict the lowest-frequency, least-recently-seen entry to make
            // room — only if the new key would outrank it (frequency 1).
            if let Some((idx, _)) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| (e.frequency, e.last_seen))
            {
                self.entries[idx] = TopKEntry { key: key.to_string(), frequency: 1, last_seen: now };
            }
        }
        self.sort();
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            b.frequency.cmp(&a.frequency).then(b.last_seen.cmp(&a.last_seen))
        });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn entries(&self) -> &[TopKEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransactionBaseline {
    pub avg: f64,
    pub max: f64,
    pub stddev: f64,
    pub n: u64,
}

impl TransactionBaseline {
    /// Welford-style running update; keeps the baseline cheap to maintain
    /// per-event instead of re-scanning transaction history.
    pub fn update(&mut self, amount: f64) {
        self.n += 1;
        let n = self.n as f64;
        let delta = amount - self.avg;
        self.avg += delta / n;
        let delta2 = amount - self.avg;
        // Running variance accumulator reused as stddev directly; n>=2 guards div-by-zero.
        let variance = if n > 1.0 {
            ((self.stddev.powi(2) * (n - 1.0)) + delta * delta2) / n
        } else {
            0.0
        };
        self.stddev = variance.max(0.0).sqrt();
        self.max = self.max.max(amount);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthStats {
    pub total_attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
}

/// The location of the user's last *successful* authentication — the only
/// history the geo_velocity processor needs, kept cheap instead of storing
/// every `LocationData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastAuthLocation {
    pub lat: f64,
    pub lon: f64,
    pub country_code: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-user aggregate of historical behaviour used as a baseline for
/// anomaly detection (spec §3 BehavioralProfile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralProfile {
    pub user_id: String,
    pub usual_hour_counts: [u64; 24],
    pub usual_day_counts: [u64; 7],
    pub usual_locations: TopKList,
    pub usual_devices: TopKList,
    pub auth_stats: AuthStats,
    pub transaction_baseline: TransactionBaseline,
    pub risk_indicators: Vec<String>,
    /// Bounded to the last 20 lightweight summaries (not the full event body).
    pub recent_events: VecDeque<RecentEventSummary>,
    pub last_auth_location: Option<LastAuthLocation>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEventSummary {
    pub event_id: String,
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

pub const RECENT_EVENTS_CAP: usize = 20;

impl BehavioralProfile {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            usual_hour_counts: [0; 24],
            usual_day_counts: [0; 7],
            usual_locations: TopKList::new(10),
            usual_devices: TopKList::new(10),
            auth_stats: AuthStats::default(),
            transaction_baseline: TransactionBaseline::default(),
            risk_indicators: Vec::new(),
            recent_events: VecDeque::with_capacity(RECENT_EVENTS_CAP),
            last_auth_location: None,
            updated_at: Utc::now(),
        }
    }

    pub fn record_summary(&mut self, event_id: &str, kind: &str, ts: DateTime<Utc>) {
        if self.recent_events.len() >= RECENT_EVENTS_CAP {
            self.recent_events.pop_front();
        }
        self.recent_events.push_back(RecentEventSummary {
            event_id: event_id.to_string(),
            kind: kind.to_string(),
            timestamp: ts,
        });
        self.updated_at = ts;
    }

    pub fn record_hour_day(&mut self, ts: DateTime<Utc>) {
        use chrono::{Datelike, Timelike};
        self.usual_hour_counts[ts.hour() as usize] += 1;
        self.usual_day_counts[ts.weekday().num_days_from_monday() as usize] += 1;
    }

    pub fn is_unseen_location(&self, country_code: &str) -> bool {
        !self.usual_locations.contains(country_code)
    }

    pub fn is_unseen_device(&self, device_id: &str) -> bool {
        !self.usual_devices.contains(device_id)
    }
}

/// Strictly time-ordered per-user event memory, retained on a rolling window
/// (default 3600s) and purged by the Context Store's sweeper — distinct from
/// `BehavioralProfile.recent_events`, which is a bounded-count summary.
#[derive(Debug, Default)]
pub struct RecentEventsWindow {
    events: VecDeque<(DateTime<Utc>, Event)>,
}

impl RecentEventsWindow {
    pub fn new() -> Self {
        Self { events: VecDeque::new() }
    }

    /// Insertion-order append; timestamps must be monotone non-decreasing
    /// in insertion order (spec invariant (c)).
    pub fn append(&mut self, ts: DateTime<Utc>, event: Event) {
        self.events.push_back((ts, event));
    }

    pub fn snapshot(&self) -> Vec<&Event> {
        self.events.iter().map(|(_, e)| e).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drops entries older than `memory_window` seconds relative to now.
    pub fn expire_older_than(&mut self, memory_window: Duration, now: DateTime<Utc>) {
        let cutoff = now - memory_window;
        while self.events.front().map(|(ts, _)| *ts < cutoff).unwrap_or(false) {
            self.events.pop_front();
        }
    }

    pub fn oldest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.events.front().map(|(ts, _)| *ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_bounded_and_ordered() {
        let mut list = TopKList::new(3);
        let now = Utc::now();
        for key in ["a", "b", "a", "c", "d", "a"] {
            list.record(key, now);
        }
        assert!(list.len() <= 3);
        // "a" has frequency 3 and must be first.
        assert_eq!(list.entries()[0].key, "a");
    }

    #[test]
    fn recent_events_window_time_expiry() {
        let mut w = RecentEventsWindow::new();
        let base = Utc::now();
        w.append(base - Duration::seconds(7200), dummy_event(base - Duration::seconds(7200)));
        w.append(base, dummy_event(base));
        w.expire_older_than(Duration::seconds(3600), base);
        assert_eq!(w.len(), 1);
    }

    fn dummy_event(ts: DateTime<Utc>) -> Event {
        use crate::events::{EventMetadata, UserActivityEvent};
        use std::collections::HashMap;
        Event::UserActivity(UserActivityEvent {
            metadata: EventMetadata {
                event_id: "e1".into(),
                tenant_id: "t1".into(),
                timestamp: ts,
                region_code: None,
                extra: HashMap::new(),
            },
            user_id: "u1".into(),
            activity_type: "login".into(),
            ip: None,
        })
    }
}
