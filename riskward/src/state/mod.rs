// riskward/src/state/mod.rs
//
// Context Store (C1): per-user behavioural profile + recent-event memory,
// sharded locking.

pub mod profile;
pub mod store;

pub use profile::{BehavioralProfile, RecentEventsWindow, TopKList};
pub use store::ContextStore;
