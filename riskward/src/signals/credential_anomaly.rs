// riskward/src/signals/credential_anomaly.rs
//
// Grounded on engine.py's CredentialAnomalyProcessor: known-breach
// credentials and consecutive-failure bursts each contribute their own
// signal rather than being folded together.

use crate::events::RiskSignal;

use super::{ProcessorInput, SignalProcessor};

const CONSECUTIVE_FAILURE_THRESHOLD: u64 = 3;

pub struct CredentialAnomalyProcessor;

impl SignalProcessor for CredentialAnomalyProcessor {
    fn name(&self) -> &'static str {
        "credential_anomaly"
    }

    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal> {
        let mut signals = Vec::new();

        if input.ctx.breached_credential {
            signals.push(RiskSignal::new("credential_anomaly", 0.9, 0.95));
        }

        let failures = input.profile.auth_stats.consecutive_failures;
        if failures >= CONSECUTIVE_FAILURE_THRESHOLD {
            let value = (0.5 + 0.1 * (failures - CONSECUTIVE_FAILURE_THRESHOLD) as f64).min(1.0);
            signals.push(RiskSignal::new("credential_anomaly", value, 0.8));
        }

        signals
    }
}
