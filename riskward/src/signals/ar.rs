// riskward/src/signals/ar.rs
//
// AR signal processors (spec §4.2 ar_* processors). Each takes the matching
// sub-bundle from ctx.ar_data, compares it against the user's template via
// the pluggable `ArTemplateMatcher` interface, and emits
// {type=ar_<kind>, value=1-score, confidence=score}. Liveness (biometric
// only) is checked first and short-circuits on failure.

use crate::connectors::{ArTemplateMatcher, DefaultArMatcher};
use crate::events::RiskSignal;

use super::{ProcessorInput, SignalProcessor};

fn emit(kind: &str, matcher: &dyn ArTemplateMatcher, user_id: &str, sample: &[f64]) -> Vec<RiskSignal> {
    let score = matcher.match_score(user_id, kind, sample);
    vec![RiskSignal::new(format!("ar_{kind}"), 1.0 - score, score)]
}

pub struct ArGestureProcessor;

impl SignalProcessor for ArGestureProcessor {
    fn name(&self) -> &'static str {
        "ar_spatial_gesture"
    }

    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal> {
        if !input.policy.feature_toggles.ar_spatial_gesture {
            return Vec::new();
        }
        let Some(ar) = &input.ctx.ar_data else { return Vec::new() };
        let Some(sample) = &ar.spatial_gesture else { return Vec::new() };
        emit("spatial_gesture", &DefaultArMatcher, &input.ctx.user_id, sample)
    }
}

pub struct ArGazeProcessor;

impl SignalProcessor for ArGazeProcessor {
    fn name(&self) -> &'static str {
        "ar_gaze_pattern"
    }

    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal> {
        if !input.policy.feature_toggles.ar_gaze_pattern {
            return Vec::new();
        }
        let Some(ar) = &input.ctx.ar_data else { return Vec::new() };
        let Some(sample) = &ar.gaze_pattern else { return Vec::new() };
        emit("gaze_pattern", &DefaultArMatcher, &input.ctx.user_id, sample)
    }
}

pub struct ArEnvironmentProcessor;

impl SignalProcessor for ArEnvironmentProcessor {
    fn name(&self) -> &'static str {
        "ar_environment"
    }

    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal> {
        if !input.policy.feature_toggles.ar_environment {
            return Vec::new();
        }
        let Some(ar) = &input.ctx.ar_data else { return Vec::new() };
        let Some(sample) = &ar.environment else { return Vec::new() };
        emit("environment", &DefaultArMatcher, &input.ctx.user_id, sample)
    }
}

pub struct ArBiometricProcessor;

impl SignalProcessor for ArBiometricProcessor {
    fn name(&self) -> &'static str {
        "ar_biometric"
    }

    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal> {
        if !input.policy.feature_toggles.ar_biometric {
            return Vec::new();
        }
        let Some(ar) = &input.ctx.ar_data else { return Vec::new() };
        let Some(sample) = &ar.biometric_3d else { return Vec::new() };

        let matcher = DefaultArMatcher;
        if !matcher.check_liveness(sample) {
            return vec![RiskSignal::new("ar_biometric", 1.0, 0.8)];
        }
        emit("biometric", &matcher, &input.ctx.user_id, sample)
    }
}
