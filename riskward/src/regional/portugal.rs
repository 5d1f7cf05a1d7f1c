// riskward/src/regional/portugal.rs
//
// No dedicated original_source pattern module was retrieved for Portugal;
// table shape follows Brazil's SEPA/MB WAY equivalent of PIX, inferred
// symmetrically per SPEC_FULL.md §3, with EU Schengen-area border handling
// replacing the cross-state distance check.

use crate::events::{DeviceFingerprint, LocationData, TransactionEvent};

use super::{DeviceContextAnalysis, LocationAnalysis, MobileMoneyAnalysis, PhoneValidation, PolicyOverlay, RegionalAnalyzer};

const MBWAY_INSTANT_LIMIT: f64 = 750.0; // EUR, typical daily MB WAY transfer cap
const MBWAY_DAILY_LIMIT: f64 = 3000.0; // EUR
const MAX_TRANSFERS_PER_HOUR: u32 = 12;

const SCHENGEN_COUNTRIES: &[&str] = &[
    "PT", "ES", "FR", "DE", "IT", "NL", "BE", "LU", "AT", "CH", "PL", "CZ", "GR",
];

pub struct PortugalAnalyzer;

impl RegionalAnalyzer for PortugalAnalyzer {
    fn region_code(&self) -> &'static str {
        "PT"
    }

    fn analyze_location(&self, location: &LocationData) -> LocationAnalysis {
        let in_schengen = SCHENGEN_COUNTRIES.contains(&location.country_code.as_str());
        let is_high_risk = !in_schengen;
        let mut flags = Vec::new();
        if is_high_risk {
            flags.push("outside_schengen_area".to_string());
        }
        LocationAnalysis { risk: if is_high_risk { 0.5 } else { 0.1 }, is_high_risk, is_urban: false, flags }
    }

    fn validate_phone(&self, number: &str) -> PhoneValidation {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        let national = digits.strip_prefix("351").map(str::to_string).unwrap_or(digits);
        let valid = national.len() == 9 && national.starts_with('9');
        PhoneValidation { valid, operator: None, format: "+351 9XXXXXXXX".to_string() }
    }

    fn analyze_mobile_money_or_pix(&self, tx: &TransactionEvent, history: &[TransactionEvent]) -> MobileMoneyAnalysis {
        let mut flags = Vec::new();
        let mut risk: f64 = 0.0;

        if tx.amount > MBWAY_INSTANT_LIMIT {
            flags.push("exceeds_instant_limit".to_string());
            risk = risk.max(0.4);
        }

        let daily_total: f64 = history
            .iter()
            .filter(|t| (tx.metadata.timestamp - t.metadata.timestamp).num_hours() < 24)
            .map(|t| t.amount)
            .sum::<f64>()
            + tx.amount;
        if daily_total > MBWAY_DAILY_LIMIT {
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
            high_risk_merchant_categories: vec!["gambling".to_string(), "crypto_exchange".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventMetadata;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};

    fn location(country_code: &str) -> LocationData {
        LocationData {
            ip: IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)),
            country_code: country_code.to_string(),
            region: None,
            city: None,
            lat: 0.0,
            lon: 0.0,
            isp: None,
            is_vpn: false,
            is_proxy: false,
            is_hosting: false,
            is_tor: false,
            confidence: 1.0,
        }
    }

    fn tx(amount: f64, ts: chrono::DateTime<Utc>) -> TransactionEvent {
        TransactionEvent {
            metadata: EventMetadata {
                event_id: "e".into(), tenant_id: "t".into(), timestamp: ts,
                region_code: Some("PT".into()), extra: HashMap::new(),
            },
            user_id: "u1".into(),
            transaction_id: "tx".into(),
            amount,
            currency: "EUR".into(),
            channel: "mbway".into(),
            counterparty: None,
            agent_id: None,
            operator: None,
            ip: None,
            device: None,
            location: None,
        }
    }

    #[test]
    fn schengen_location_is_not_high_risk() {
        let analysis = PortugalAnalyzer.analyze_location(&location("ES"));
        assert!(!analysis.is_high_risk);
    }

    #[test]
    fn non_schengen_location_is_high_risk() {
        let analysis = PortugalAnalyzer.analyze_location(&location("BR"));
        assert!(analysis.is_high_risk);
    }

    #[test]
    fn instant_limit_exceeded_flags() {
        let now = Utc::now();
        let t = tx(1000.0, now);
        let analysis = PortugalAnalyzer.analyze_mobile_money_or_pix(&t, &[]);
        assert!(analysis.flags.contains(&"exceeds_instant_limit".to_string()));
    }
}
