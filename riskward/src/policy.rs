// riskward/src/policy.rs
//
// Policy Resolver (C5). Maps (risk_level, tenant_policy) to required
// authentication factors, and for transactions to an allow/verify/block
// verdict relative to the tenant's default security level.

use crate::config::AdaptivePolicy;
use crate::events::{AuthFactor, RiskLevel, RiskSignal, TransactionVerdict};

pub fn required_factors(level: RiskLevel, policy: &AdaptivePolicy) -> Vec<AuthFactor> {
    match level {
        RiskLevel::Low => policy.factors_low.clone(),
        RiskLevel::Medium => policy.factors_medium.clone(),
        RiskLevel::High => policy.factors_high.clone(),
        RiskLevel::Critical => policy.factors_critical.clone(),
    }
}

fn level_rank(level: RiskLevel) -> u8 {
    match level {
        RiskLevel::Low => 0,
        RiskLevel::Medium => 1,
        RiskLevel::High => 2,
        RiskLevel::Critical => 3,
    }
}

/// `allow` when assessed level is at or below the tenant's default; `verify`
/// one step above; `block` more than one step above.
pub fn transaction_verdict(level: RiskLevel, policy: &AdaptivePolicy) -> TransactionVerdict {
    let delta = level_rank(level) as i8 - level_rank(policy.default_security_level) as i8;
    if delta <= 0 {
        TransactionVerdict::Allow
    } else if delta == 1 {
        TransactionVerdict::Verify
    } else {
        TransactionVerdict::Block
    }
}

/// Human-readable reason: the top-3 signals by value descending, using a
/// stable template per signal type (falls back to a generic template for
/// unrecognized types so the aggregator can add new signal kinds freely).
pub fn build_reason(signals: &[RiskSignal]) -> String {
    let mut sorted: Vec<&RiskSignal> = signals.iter().collect();
    sorted.sort_by(|a, b| b.value.as_f64().partial_cmp(&a.value.as_f64()).unwrap());

    let parts: Vec<String> = sorted.iter().take(3).map(|s| template_for(s)).collect();
    if parts.is_empty() {
        "no anomalous signals detected".to_string()
    } else {
        parts.join("; ")
    }
}

fn template_for(signal: &RiskSignal) -> String {
    let v = signal.value.as_f64();
    match signal.signal_type.as_str() {
        "ip_reputation" => format!("suspicious network origin (score {:.2})", v),
        "geo_velocity" => format!("impossible travel detected (score {:.2})", v),
        "device_trust" => format!("untrusted device (score {:.2})", v),
        "behavioral" => format!("behaviour deviates from baseline (score {:.2})", v),
        "time_pattern" => format!("unusual access time (score {:.2})", v),
        "credential_anomaly" => format!("credential anomaly (score {:.2})", v),
        "rule_engine" => format!("tenant rule triggered (score {:.2})", v),
        other => format!("{other} signal (score {:.2})", v),
    }
}
