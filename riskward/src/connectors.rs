// riskward/src/connectors.rs
//
// Interface-only external collaborators (spec §1 Non-goals, §6 "External
// connectors"). Each trait describes the contract the core consumes; the
// stub implementations log intent instead of making a network call, the
// same "full interface with a simulated backend" pattern the teacher uses
// in its Kafka/Redis adapters. Event payloads already carry enriched
// location/reputation fields by the time they reach this core (the
// lookup happens upstream, outside this crate's boundary), so most of
// these contracts are declared but not called from the pipeline itself.
#![allow(dead_code)]

use async_trait::async_trait;
use tracing::debug;

use crate::events::LocationData;

#[derive(Debug, Clone, Default)]
pub struct CreditScoreResult {
    pub success: bool,
    pub credit_score: Option<u32>,
    pub has_restrictions: bool,
    pub is_watchlisted: bool,
}

#[async_trait]
pub trait CreditBureau: Send + Sync {
    async fn check_credit_score(&self, user_id: &str) -> CreditScoreResult;
}

pub struct StubCreditBureau;

#[async_trait]
impl CreditBureau for StubCreditBureau {
    async fn check_credit_score(&self, user_id: &str) -> CreditScoreResult {
        debug!(user_id, "stub credit bureau call — no real bureau wired in");
        CreditScoreResult::default()
    }
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn lookup(&self, ip: std::net::IpAddr) -> Option<LocationData>;
}

pub struct StubGeolocator;

#[async_trait]
impl Geolocator for StubGeolocator {
    async fn lookup(&self, ip: std::net::IpAddr) -> Option<LocationData> {
        debug!(%ip, "stub geolocator call — no real MaxMind/IP2Location backend wired in");
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct IpReputationResult {
    pub is_vpn: bool,
    pub is_proxy: bool,
    pub is_tor: bool,
    pub is_hosting: bool,
}

#[async_trait]
pub trait IpReputationProvider: Send + Sync {
    async fn check(&self, ip: std::net::IpAddr) -> IpReputationResult;
}

pub struct StubIpReputationProvider;

#[async_trait]
impl IpReputationProvider for StubIpReputationProvider {
    async fn check(&self, ip: std::net::IpAddr) -> IpReputationResult {
        debug!(%ip, "stub IP reputation call — no real feed wired in");
        IpReputationResult::default()
    }
}

/// Resolved per §9 Open Question 4: AR match scoring in the original used
/// hashed pseudo-randomness; here it is a real (if simplistic) template
/// comparison behind a pluggable interface so a production deployment can
/// swap in a real biometric SDK without touching signals::ar.
pub trait ArTemplateMatcher: Send + Sync {
    /// Cosine similarity in [0,1] between `sample` and the user's stored
    /// template for this AR modality. `None` template ⇒ neutral 0.5.
    fn match_score(&self, user_id: &str, kind: &str, sample: &[f64]) -> f64;
    /// AR biometric liveness check; evaluated before match scoring.
    fn check_liveness(&self, sample: &[f64]) -> bool;
}

/// Default matcher: cosine similarity against a deterministic unit template
/// (all components equal), standing in for a per-user enrolled template
/// store. Liveness passes when the sample has non-zero variance (a flat,
/// all-equal sample is the textbook sign of a replayed/static capture).
pub struct DefaultArMatcher;

impl ArTemplateMatcher for DefaultArMatcher {
    fn match_score(&self, _user_id: &str, _kind: &str, sample: &[f64]) -> f64 {
        if sample.is_empty() {
            return 0.5;
        }
        let n = sample.len() as f64;
        let template_component = 1.0 / n.sqrt();
        let dot: f64 = sample.iter().map(|v| v * template_component).sum();
        let norm: f64 = sample.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            0.0
        } else {
            (dot / norm).clamp(0.0, 1.0)
        }
    }

    fn check_liveness(&self, sample: &[f64]) -> bool {
        if sample.len() < 2 {
            return true;
        }
        let mean = sample.iter().sum::<f64>() / sample.len() as f64;
        let variance = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / sample.len() as f64;
        variance > 1e-6
    }
}
