// riskward/src/signals/behavioral.rs
//
// Grounded on engine.py's BehavioralProcessor: compares the current event
// against the user's profile baseline, flagging ≥2-sigma deviation on at
// least two numeric features or an unseen categorical value. Confidence
// scales with how much baseline data backs the comparison.

use crate::events::RiskSignal;

use super::{ProcessorInput, SignalProcessor};

const SIGMA_THRESHOLD: f64 = 2.0;

fn mean_stddev(counts: &[u64]) -> (f64, f64) {
    let n = counts.len() as f64;
    let mean = counts.iter().sum::<u64>() as f64 / n;
    let variance = counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub struct BehavioralProcessor;

impl SignalProcessor for BehavioralProcessor {
    fn name(&self) -> &'static str {
        "behavioral"
    }

    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal> {
        if !input.policy.feature_toggles.behavioral {
            return Vec::new();
        }

        let profile = input.profile;
        let sample_size: u64 = profile.usual_hour_counts.iter().sum();

        let mut deviating_features = 0u32;

        // Feature 1: how rare the current hour is relative to the user's
        // typical hourly distribution.
        if sample_size >= 5 {
            use chrono::Timelike;
            let (mean, stddev) = mean_stddev(&profile.usual_hour_counts);
            if stddev > 0.0 {
                let hour = input.ctx.timestamp.hour() as usize;
                let count = profile.usual_hour_counts[hour] as f64;
                let z = (mean - count).abs() / stddev;
                if z >= SIGMA_THRESHOLD {
                    deviating_features += 1;
                }
            }
        }

        // Feature 2: device risk score relative to an assumed-trusted baseline.
        let device_z = input.ctx.device_data.risk_score / 0.15;
        if device_z >= SIGMA_THRESHOLD {
            deviating_features += 1;
        }

        // Categorical: unseen location or device.
        let unseen_location = sample_size >= 5
            && !profile.usual_locations.is_empty()
            && profile.is_unseen_location(&input.ctx.location_data.country_code);
        let unseen_device = !profile.usual_devices.is_empty()
            && profile.is_unseen_device(&input.ctx.device_data.device_id);

        if deviating_features < 2 && !unseen_location && !unseen_device {
            return Vec::new();
        }

        let value = (0.3 + 0.15 * deviating_features as f64
            + if unseen_location { 0.2 } else { 0.0 }
            + if unseen_device { 0.1 } else { 0.0 })
        .min(1.0);

        // Confidence scales with baseline sample size, capping at 20 events.
        let confidence = (sample_size as f64 / 20.0).min(1.0).max(0.2);

        vec![RiskSignal::new("behavioral", value, confidence)]
    }
}
