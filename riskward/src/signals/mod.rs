// riskward/src/signals/mod.rs
//
// Signal Processors (C2). Each processor is stateless and addressable by a
// stable name; persistent state lives in the Context Store (C1). Processor
// panics are caught here so one bad processor cannot take down the batch
// (spec §4.2 "Processor exceptions are caught... the pipeline continues").

pub mod ar;
pub mod behavioral;
pub mod credential_anomaly;
pub mod device_analysis;
pub mod geo_velocity;
pub mod ip_reputation;
pub mod time_pattern;

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::config::AdaptivePolicy;
use crate::events::{AuthContext, RiskSignal};
use crate::state::profile::BehavioralProfile;

/// Evaluation context handed to every processor: the request bundle plus the
/// user's profile snapshot and tenant policy, all read-only.
pub struct ProcessorInput<'a> {
    pub ctx: &'a AuthContext,
    pub profile: &'a BehavioralProfile,
    pub policy: &'a AdaptivePolicy,
}

pub trait SignalProcessor: Send + Sync {
    fn name(&self) -> &'static str;
    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal>;
}

pub fn registry() -> Vec<Box<dyn SignalProcessor>> {
    vec![
        Box::new(ip_reputation::IpReputationProcessor),
        Box::new(geo_velocity::GeoVelocityProcessor),
        Box::new(device_analysis::DeviceAnalysisProcessor),
        Box::new(behavioral::BehavioralProcessor),
        Box::new(time_pattern::TimePatternProcessor),
        Box::new(credential_anomaly::CredentialAnomalyProcessor),
        Box::new(ar::ArGestureProcessor),
        Box::new(ar::ArGazeProcessor),
        Box::new(ar::ArEnvironmentProcessor),
        Box::new(ar::ArBiometricProcessor),
    ]
}

/// Runs every registered processor over the same input and flattens the
/// results. A panicking processor contributes an empty signal list instead
/// of aborting the run.
pub fn run_all(input: &ProcessorInput) -> Vec<RiskSignal> {
    let mut out = Vec::new();
    for proc in registry() {
        let name = proc.name();
        match catch_unwind(AssertUnwindSafe(|| proc.process(input))) {
            Ok(mut signals) => out.append(&mut signals),
            Err(_) => {
                warn!(processor = name, "processor panicked, producing no signals");
            }
        }
    }
    out
}
