// riskward/src/regional/brazil.rs
//
// Grounded on brazil_behavioral_patterns.py: PIX transaction limits,
// cross-state MFA trigger distance, and high-risk merchant categories.

use chrono::Timelike;

use crate::events::{DeviceFingerprint, LocationData, TransactionEvent};

use super::{DeviceContextAnalysis, LocationAnalysis, MobileMoneyAnalysis, PhoneValidation, PolicyOverlay, RegionalAnalyzer};

const PIX_INSTANT_LIMIT: f64 = 5000.0;
const PIX_DAILY_LIMIT: f64 = 20_000.0;
const PIX_UNUSUAL_HOUR_LIMIT: f64 = 2000.0;
const MAX_PIX_PER_HOUR: usize = 15;
const CROSS_STATE_THRESHOLD_KM: f64 = 300.0;

const STATE_CAPITALS: &[&str] = &[
    "sao paulo", "rio de janeiro", "brasilia", "salvador", "fortaleza",
    "belo horizonte", "manaus", "curitiba", "recife", "porto alegre",
];

const HIGH_RISK_MERCHANT_CATEGORIES: &[&str] =
    &["gambling", "crypto_exchange", "money_transfer", "adult_entertainment"];

fn pix_transfers_in_last_hour(history: &[TransactionEvent], now: chrono::DateTime<chrono::Utc>) -> (usize, usize) {
    let cutoff = now - chrono::Duration::minutes(59);
    let recent: Vec<&TransactionEvent> = history
        .iter()
        .filter(|t| t.channel == "pix" && t.metadata.timestamp >= cutoff)
        .collect();
    let distinct_recipients: std::collections::HashSet<&str> =
        recent.iter().filter_map(|t| t.counterparty.as_deref()).collect();
    (recent.len(), distinct_recipients.len())
}

pub struct BrazilAnalyzer;

impl RegionalAnalyzer for BrazilAnalyzer {
    fn region_code(&self) -> &'static str {
        "BR"
    }

    fn analyze_location(&self, location: &LocationData) -> LocationAnalysis {
        let mut flags = Vec::new();
        let is_urban = location
            .city
            .as_deref()
            .map(|c| STATE_CAPITALS.contains(&c.to_lowercase().as_str()))
            .unwrap_or(false);
        let is_high_risk = location.country_code != "BR";
        if is_high_risk {
            flags.push("cross_border_transaction".to_string());
        }
        LocationAnalysis { risk: if is_high_risk { 0.5 } else { 0.1 }, is_high_risk, is_urban, flags }
    }

    fn validate_phone(&self, number: &str) -> PhoneValidation {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        // +55 DD NNNNNNNNN — country code 55, 2-digit area code, 8-9 digit line.
        let valid = digits.len() == 13 && digits.starts_with("55")
            || digits.len() == 11; // national format without country code
        PhoneValidation { valid, operator: None, format: "+55 DD NNNNNNNNN".to_string() }
    }

    fn analyze_mobile_money_or_pix(&self, tx: &TransactionEvent, history: &[TransactionEvent]) -> MobileMoneyAnalysis {
        let mut flags = Vec::new();
        let mut risk: f64 = 0.0;

        if tx.amount > PIX_INSTANT_LIMIT {
            flags.push("exceeds_instant_limit".to_string());
            risk = risk.max(0.4);
        }
        if tx.amount > PIX_DAILY_LIMIT {
            flags.push("exceeds_daily_limit".to_string());
            risk = risk.max(0.6);
        }
        let hour = tx.metadata.timestamp.hour();
        if (0..6).contains(&hour) && tx.amount > PIX_UNUSUAL_HOUR_LIMIT {
            flags.push("unusual_hour_large_amount".to_string());
            risk = risk.max(0.5);
        }

        let (count, distinct_recipients) = pix_transfers_in_last_hour(history, tx.metadata.timestamp);
        if count + 1 > MAX_PIX_PER_HOUR && distinct_recipients >= MAX_PIX_PER_HOUR {
            flags.push("pix_rapid_fanout".to_string());
            risk = risk.max(0.7);
        }

        let recommendation = if risk >= 0.6 { "review" } else if risk > 0.0 { "monitor" } else { "none" };
        MobileMoneyAnalysis { risk, flags, recommendation: recommendation.to_string() }
    }

    fn analyze_device_context(&self, device: &DeviceFingerprint, _history: &[DeviceFingerprint]) -> DeviceContextAnalysis {
        let mut flags = Vec::new();
        let mut risk = 0.0;
        if !device.trusted {
            flags.push("untrusted_device".to_string());
            risk = risk_f64_max(risk, 0.3);
        }
        DeviceContextAnalysis { risk, flags }
    }

    fn get_regional_rules(&self) -> PolicyOverlay {
        PolicyOverlay {
            max_transactions_per_hour: Some(MAX_PIX_PER_HOUR as u32),
            cross_region_mfa_required: true,
            high_risk_merchant_categories: HIGH_RISK_MERCHANT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn risk_f64_max(a: f64, b: f64) -> f64 {
    a.max(b)
}

pub fn exceeds_cross_state_distance(distance_km: f64) -> bool {
    distance_km >= CROSS_STATE_THRESHOLD_KM
}
