// riskward/src/config.rs
//
// Tenant configuration surface. Operators load a YAML/JSON registry of
// TenantConfig at boot (serde_yaml/serde_json); policies are read-mostly
// and may be hot-reloaded by swapping the Arc the consumers hold.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RiskwardError};
use crate::events::AuthFactor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self { medium: 0.3, high: 0.6, critical: 0.8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureToggles {
    pub geo_check: bool,
    pub device_fingerprint: bool,
    pub behavioral: bool,
    pub velocity: bool,
    pub impossible_travel: bool,
    pub ar_spatial_gesture: bool,
    pub ar_gaze_pattern: bool,
    pub ar_environment: bool,
    pub ar_biometric: bool,
    /// Enables the optional C10 agent fan-out (rules/behavioural/ML agents)
    /// and feeds its result into the aggregator as `ml_score`.
    pub orchestrator_agents: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            geo_check: true,
            device_fingerprint: true,
            behavioral: true,
            velocity: true,
            impossible_travel: true,
            ar_spatial_gesture: false,
            ar_gaze_pattern: false,
            ar_environment: false,
            ar_biometric: false,
            orchestrator_agents: false,
        }
    }
}

/// Per-tenant adaptive authentication policy. Loaded from the tenant
/// registry; the factor-monotonicity invariant (P1) is checked once here so
/// the rest of the pipeline can assume it holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptivePolicy {
    pub tenant_id: String,
    pub risk_thresholds: RiskThresholds,
    pub factors_low: Vec<AuthFactor>,
    pub factors_medium: Vec<AuthFactor>,
    pub factors_high: Vec<AuthFactor>,
    pub factors_critical: Vec<AuthFactor>,
    pub feature_toggles: FeatureToggles,
    pub sensitivity: f64,
    pub geo_velocity_threshold_kmh: f64,
    pub baseline_days: u32,
    pub trusted_device_expiry_days: u32,
    pub default_security_level: crate::events::RiskLevel,
    pub alert_threshold: f64,
    pub alert_cooldown_secs: i64,
    pub signal_weights: HashMap<String, f64>,
    pub high_risk_countries: Vec<String>,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl AdaptivePolicy {
    pub fn default_weights() -> HashMap<String, f64> {
        [
            ("ip_reputation", 0.20),
            ("geo_velocity", 0.15),
            ("device_trust", 0.15),
            ("behavioral", 0.20),
            ("time_pattern", 0.10),
            ("new_location", 0.15),
            ("failed_attempts", 0.20),
            ("credential_anomaly", 0.20),
            ("ar_spatial_gesture", 0.15),
            ("ar_gaze_pattern", 0.15),
            ("ar_environment", 0.15),
            ("ar_biometric", 0.15),
            ("rule_engine", 0.50),
            ("ml", 0.40),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// Rejects configurations violating factor-count monotonicity
    /// (|factors[LOW]| ≤ |factors[MEDIUM]| ≤ |factors[HIGH]| ≤ |factors[CRITICAL]|).
    pub fn validate(&self) -> Result<()> {
        let counts = [
            self.factors_low.len(),
            self.factors_medium.len(),
            self.factors_high.len(),
            self.factors_critical.len(),
        ];
        if !counts.windows(2).all(|w| w[0] <= w[1]) {
            return Err(RiskwardError::InvalidPolicy {
                tenant_id: self.tenant_id.clone(),
                reason: format!(
                    "required-factor counts must be non-decreasing by risk level, got {:?}",
                    counts
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.sensitivity) {
            return Err(RiskwardError::InvalidPolicy {
                tenant_id: self.tenant_id.clone(),
                reason: format!("sensitivity {} out of [0,1]", self.sensitivity),
            });
        }
        let t = &self.risk_thresholds;
        if !(t.medium < t.high && t.high < t.critical) {
            return Err(RiskwardError::InvalidPolicy {
                tenant_id: self.tenant_id.clone(),
                reason: "risk_thresholds must satisfy medium < high < critical".into(),
            });
        }
        Ok(())
    }
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        Self {
            tenant_id: "default".into(),
            risk_thresholds: RiskThresholds::default(),
            factors_low: vec![AuthFactor::Password],
            factors_medium: vec![AuthFactor::Password, AuthFactor::Totp],
            factors_high: vec![AuthFactor::Password, AuthFactor::Totp, AuthFactor::Sms],
            factors_critical: vec![
                AuthFactor::Password,
                AuthFactor::Totp,
                AuthFactor::Push,
                AuthFactor::Biometric,
            ],
            feature_toggles: FeatureToggles::default(),
            sensitivity: 0.7,
            geo_velocity_threshold_kmh: 700.0,
            baseline_days: 30,
            trusted_device_expiry_days: 90,
            default_security_level: crate::events::RiskLevel::Medium,
            alert_threshold: 0.6,
            alert_cooldown_secs: 600,
            signal_weights: Self::default_weights(),
            high_risk_countries: vec!["KP".into(), "IR".into(), "SY".into()],
            max_retries: 5,
            retry_base_delay_ms: 200,
        }
    }
}

/// External, interface-only: the platform's tenant registry entry. The core
/// only reads the fields it needs; markets/regions/compliance schemas are
/// owned by the surrounding platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: String,
    pub markets: Vec<String>,
    pub regions: Vec<String>,
    pub default_security_level: crate::events::RiskLevel,
    pub required_factors: Vec<AuthFactor>,
    pub policy: AdaptivePolicy,
    #[serde(default)]
    pub rules: Vec<crate::rules::Rule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TenantRegistry {
    pub tenants: Vec<TenantConfig>,
}

impl TenantRegistry {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let registry: Self = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&raw)?
        } else {
            serde_yaml::from_str(&raw)?
        };
        for tenant in &registry.tenants {
            tenant.policy.validate()?;
        }
        Ok(registry)
    }

    pub fn get(&self, tenant_id: &str) -> Option<&TenantConfig> {
        self.tenants.iter().find(|t| t.tenant_id == tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        AdaptivePolicy::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_monotone_factors() {
        let mut p = AdaptivePolicy::default();
        p.factors_high = vec![AuthFactor::Password];
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_bad_thresholds() {
        let mut p = AdaptivePolicy::default();
        p.risk_thresholds.high = 0.1;
        assert!(p.validate().is_err());
    }
}
