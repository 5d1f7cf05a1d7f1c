// riskward/src/state/store.rs
//
// Context Store (C1). DashMap gives us the "global lock protects the
// user_id -> Profile map" semantics without an explicit mutex: lookups take
// a sharded read path, inserts take a sharded write path, and the entry's
// own RwLock guards both the profile and its recent-events window so no
// thread ever holds two per-user locks at once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::events::Event;
use crate::state::profile::{BehavioralProfile, RecentEventsWindow};

pub struct UserState {
    pub profile: BehavioralProfile,
    pub recent: RecentEventsWindow,
}

impl UserState {
    fn new(user_id: &str) -> Self {
        Self { profile: BehavioralProfile::new(user_id), recent: RecentEventsWindow::new() }
    }
}

pub struct ContextStore {
    users: DashMap<String, Arc<RwLock<UserState>>>,
    pub memory_window: Duration,
    pub profile_load_failures: AtomicU64,
}

impl ContextStore {
    pub fn new(memory_window_secs: i64) -> Self {
        Self {
            users: DashMap::new(),
            memory_window: Duration::seconds(memory_window_secs),
            profile_load_failures: AtomicU64::new(0),
        }
    }

    fn entry(&self, user_id: &str) -> Arc<RwLock<UserState>> {
        self.users
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(UserState::new(user_id))))
            .clone()
    }

    /// Lazy-create lookup. A real deployment backs this with an external
    /// store (Redis/Postgres); a load failure there degrades to an empty
    /// default profile rather than failing the request (spec §4.1).
    pub fn get_profile(&self, user_id: &str) -> BehavioralProfile {
        self.entry(user_id).read().profile.clone()
    }

    pub fn record_profile_load_failure(&self, user_id: &str) {
        self.profile_load_failures.fetch_add(1, Ordering::Relaxed);
        warn!(user_id, "profile load failed, degrading to empty default");
    }

    pub fn append_recent_event(&self, user_id: &str, ts: chrono::DateTime<Utc>, event: Event) {
        let state = self.entry(user_id);
        let mut w = state.write();
        w.recent.append(ts, event);
        w.profile.record_hour_day(ts);
    }

    pub fn recent_events_snapshot(&self, user_id: &str) -> Vec<Event> {
        match self.users.get(user_id) {
            Some(state) => state.read().recent.snapshot().into_iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Applies a mutation closure to the profile under the single per-user
    /// lock, then records the event's summary and any anomaly indicators.
    pub fn update_profile(
        &self,
        user_id: &str,
        event_id: &str,
        kind: &str,
        ts: chrono::DateTime<Utc>,
        anomalies: &[String],
        mutate: impl FnOnce(&mut BehavioralProfile),
    ) {
        let state = self.entry(user_id);
        let mut w = state.write();
        mutate(&mut w.profile);
        w.profile.record_summary(event_id, kind, ts);
        for a in anomalies {
            if !w.profile.risk_indicators.contains(a) {
                w.profile.risk_indicators.push(a.clone());
            }
        }
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    /// Background sweeper: wakes every 60s, snapshots user ids, then per
    /// user takes the per-user lock and expires stale recent-events (P5).
    pub async fn housekeeping_loop(self: Arc<Self>) {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
            self.sweep_once();
        }
    }

    pub fn sweep_once(&self) {
        let now = Utc::now();
        let user_ids: Vec<String> = self.users.iter().map(|e| e.key().clone()).collect();
        let mut swept = 0usize;
        for user_id in user_ids {
            if let Some(state) = self.users.get(&user_id) {
                let mut w = state.write();
                let before = w.recent.len();
                w.recent.expire_older_than(self.memory_window, now);
                if before != w.recent.len() {
                    swept += 1;
                }
            }
        }
        if swept > 0 {
            info!(swept, "housekeeping swept stale recent-events windows");
        }
        self.users.retain(|_, state| {
            let s = state.read();
            !s.recent.is_empty() || !s.profile.recent_events.is_empty()
        });
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(3600)
    }
}
