// riskward/src/regional/angola.rs
//
// Grounded on the Angolan behavioural-patterns module (high-risk border
// provinces, urban centres, Multicaixa Express transfer limits) and the
// Angola fraud-agent pattern catalogue, both retrieved from
// original_source. Limits below are the mobile-money figures from that
// module (single_transaction_limit / daily_limit_kwanza); the per-hour
// fan-out cap has no direct source equivalent (the original counts
// max_daily_transactions) and is kept as an inferred hourly throttle per
// SPEC_FULL.md §3.

use crate::events::{DeviceFingerprint, LocationData, TransactionEvent};

use super::{DeviceContextAnalysis, LocationAnalysis, MobileMoneyAnalysis, PhoneValidation, PolicyOverlay, RegionalAnalyzer};

const MULTICAIXA_SINGLE_LIMIT: f64 = 50_000.0; // AOA, mobile_money.single_transaction_limit
const MULTICAIXA_DAILY_LIMIT: f64 = 100_000.0; // AOA, mobile_money.daily_limit_kwanza
const MAX_TRANSFERS_PER_HOUR: u32 = 10; // mobile_money.max_daily_transactions, applied as an hourly throttle

// Border/remote provinces flagged as high risk in the source module.
const HIGH_RISK_ZONES: &[&str] =
    &["cabinda", "zaire", "uige", "malanje", "lunda norte", "lunda sul", "moxico", "cuando cubango", "cunene", "namibe"];

pub struct AngolaAnalyzer;

impl RegionalAnalyzer for AngolaAnalyzer {
    fn region_code(&self) -> &'static str {
        "AO"
    }

    fn analyze_location(&self, location: &LocationData) -> LocationAnalysis {
        let is_cross_border = location.country_code != "AO";
        let province = location.region.as_deref().unwrap_or("").to_lowercase();
        let city = location.city.as_deref().unwrap_or("").to_lowercase();
        let in_high_risk_zone = HIGH_RISK_ZONES.iter().any(|z| province.contains(z) || city.contains(z));
        let is_high_risk = is_cross_border || in_high_risk_zone;

        let mut flags = Vec::new();
        if is_cross_border {
            flags.push("cross_border_transaction".to_string());
        }
        if in_high_risk_zone {
            flags.push("high_risk_border_province".to_string());
        }

        let is_urban = !in_high_risk_zone
            && matches!(city.as_str(), "luanda" | "benguela" | "huambo" | "lubango");

        let risk = if is_cross_border && in_high_risk_zone {
            0.7
        } else if is_cross_border {
            0.5
        } else if in_high_risk_zone {
            0.3
        } else if is_urban {
            0.05
        } else {
            0.1
        };

        LocationAnalysis { risk, is_high_risk, is_urban, flags }
    }

    fn validate_phone(&self, number: &str) -> PhoneValidation {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        let national = digits.strip_prefix("244").map(str::to_string).unwrap_or(digits);
        // Angolan mobile ranges: 9XX with XX in {1,2} Unitel, {3,4,9} Movicel/Africell.
        let valid = national.len() == 9 && national.starts_with('9');
        PhoneValidation { valid, operator: None, format: "+244 9XXXXXXXX".to_string() }
    }

    fn analyze_mobile_money_or_pix(&self, tx: &TransactionEvent, history: &[TransactionEvent]) -> MobileMoneyAnalysis {
        let mut flags = Vec::new();
        let mut risk: f64 = 0.0;

        if tx.amount > MULTICAIXA_SINGLE_LIMIT {
            flags.push("exceeds_single_transfer_limit".to_string());
            risk = risk.max(0.4);
        }

        let daily_total: f64 = history
            .iter()
            .filter(|t| (tx.metadata.timestamp - t.metadata.timestamp).num_hours() < 24)
            .map(|t| t.amount)
            .sum::<f64>()
            + tx.amount;
        if daily_total > MULTICAIXA_DAILY_LIMIT {
            flags.push("exceeds_daily_limit".to_string());
            risk = risk.max(0.6);
        }

        let transfers_last_hour = history
            .iter()
            .filter(|t| (tx.metadata.timestamp - t.metadata.timestamp).num_minutes() <= 59)
            .count()
            + 1;
        if transfers_last_hour as u32 > MAX_TRANSFERS_PER_HOUR {
            flags.push("rapid_transfer_fanout".to_string());
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
            risk = 0.3_f64.max(risk);
        }
        DeviceContextAnalysis { risk, flags }
    }

    fn get_regional_rules(&self) -> PolicyOverlay {
        PolicyOverlay {
            max_transactions_per_hour: Some(MAX_TRANSFERS_PER_HOUR),
            cross_region_mfa_required: true,
            high_risk_merchant_categories: vec!["money_transfer".to_string(), "gambling".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventMetadata;
    use chrono::Utc;
    use std::collections::HashMap;

    fn tx(amount: f64, ts: chrono::DateTime<Utc>) -> TransactionEvent {
        TransactionEvent {
            metadata: EventMetadata {
                event_id: "e".into(), tenant_id: "t".into(), timestamp: ts,
                region_code: Some("AO".into()), extra: HashMap::new(),
            },
            user_id: "u1".into(),
            transaction_id: "tx".into(),
            amount,
            currency: "AOA".into(),
            channel: "multicaixa".into(),
            counterparty: None,
            agent_id: None,
            operator: None,
            ip: None,
            device: None,
            location: None,
        }
    }

    #[test]
    fn single_transfer_over_limit_flags() {
        let now = Utc::now();
        let t = tx(600_000.0, now);
        let analysis = AngolaAnalyzer.analyze_mobile_money_or_pix(&t, &[]);
        assert!(analysis.flags.contains(&"exceeds_single_transfer_limit".to_string()));
    }

    #[test]
    fn rapid_fanout_over_hourly_cap() {
        let now = Utc::now();
        let mut history = Vec::new();
        for i in 0..10 {
            history.push(tx(1000.0, now - chrono::Duration::minutes(i)));
        }
        let newest = tx(1000.0, now);
        let analysis = AngolaAnalyzer.analyze_mobile_money_or_pix(&newest, &history);
        assert!(analysis.flags.contains(&"rapid_transfer_fanout".to_string()));
    }
}
