// riskward/src/aggregator.rs
//
// Risk Aggregator (C4). Weighted combination of C2 signals, an optional ML
// score and the C3 rule score into a single risk score and level. The rule
// score is re-injected as a synthetic `rule_engine` signal rather than
// combined via max() (§9 Open Question 2), so it takes part in the same
// weighted average as every other signal instead of silently overriding it.

use crate::config::AdaptivePolicy;
use crate::events::{RiskLevel, RiskSignal};

pub struct AggregationInput<'a> {
    pub signals: &'a [RiskSignal],
    pub rule_score: Option<f64>,
    pub ml_score: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AggregationResult {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

/// Monotone remap with an identity fixpoint at sensitivity=0.5 (P3, P9):
/// values above 0.5 push risk toward 1, values below push it toward 0, and
/// 0 / 1 are always fixed points regardless of sensitivity.
pub fn sensitivity_remap(r: f64, sensitivity: f64) -> f64 {
    if sensitivity > 0.5 {
        r + (1.0 - r) * 2.0 * (sensitivity - 0.5) * r
    } else if sensitivity < 0.5 {
        r - r * 2.0 * (0.5 - sensitivity) * (1.0 - r)
    } else {
        r
    }
}

pub fn weighted_base(signals: &[RiskSignal], weights: &std::collections::HashMap<String, f64>) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for signal in signals {
        let weight = weights.get(&signal.signal_type).copied().unwrap_or(0.1);
        let effective = weight * signal.confidence;
        numerator += signal.value.as_f64() * effective;
        denominator += effective;
    }
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.5 // explicit "no-info" prior
    }
}

pub fn aggregate(input: &AggregationInput, policy: &AdaptivePolicy) -> AggregationResult {
    let mut signals: Vec<RiskSignal> = input.signals.to_vec();
    if let Some(rule_score) = input.rule_score {
        signals.push(RiskSignal::new("rule_engine", rule_score, 1.0));
    }

    let base = weighted_base(&signals, &policy.signal_weights);

    let combined = match input.ml_score {
        Some(ml) => 0.6 * base + 0.4 * ml,
        None => base,
    };

    let remapped = sensitivity_remap(combined, policy.sensitivity).clamp(0.0, 1.0);

    let level = level_for(remapped, policy);

    AggregationResult { risk_score: remapped, risk_level: level }
}

pub fn level_for(score: f64, policy: &AdaptivePolicy) -> RiskLevel {
    let t = &policy.risk_thresholds;
    if score >= t.critical {
        RiskLevel::Critical
    } else if score >= t.high {
        RiskLevel::High
    } else if score >= t.medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RiskSignal;

    #[test]
    fn no_signals_falls_back_to_no_info_prior() {
        let mut policy = AdaptivePolicy::default();
        policy.sensitivity = 0.5; // isolate the prior from the sensitivity remap
        let input = AggregationInput { signals: &[], rule_score: None, ml_score: None };
        let result = aggregate(&input, &policy);
        assert_eq!(result.risk_score, 0.5);
        assert_eq!(result.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn sensitivity_identity_at_half() {
        for r in [0.0, 0.2, 0.5, 0.8, 1.0] {
            assert!((sensitivity_remap(r, 0.5) - r).abs() < 1e-12);
        }
    }

    #[test]
    fn sensitivity_remap_fixpoints() {
        for s in [0.0, 0.3, 0.5, 0.7, 1.0] {
            assert!((sensitivity_remap(0.0, s)).abs() < 1e-12);
            assert!((sensitivity_remap(1.0, s) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn scenario_s2_vpn_plus_high_risk_country() {
        let policy = AdaptivePolicy::default();
        let signals = vec![RiskSignal::new("ip_reputation", 0.8, 0.9), RiskSignal::new("ip_reputation", 0.9, 0.95)];
        let base = weighted_base(&signals, &policy.signal_weights);
        assert!((base - 0.851).abs() < 0.001);
        let remapped = sensitivity_remap(base, 0.5);
        assert_eq!(level_for(remapped, &policy), RiskLevel::Critical);
    }

    #[test]
    fn range_is_always_in_0_1() {
        let policy = AdaptivePolicy::default();
        let signals = vec![RiskSignal::new("behavioral", 5.0, 2.0), RiskSignal::new("time_pattern", -3.0, 10.0)];
        let input = AggregationInput { signals: &signals, rule_score: Some(2.0), ml_score: Some(3.0) };
        let result = aggregate(&input, &policy);
        assert!((0.0..=1.0).contains(&result.risk_score));
    }
}
