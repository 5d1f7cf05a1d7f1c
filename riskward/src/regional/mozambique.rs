// riskward/src/regional/mozambique.rs
//
// Grounded on mozambique_behavioral_patterns.py: M-Pesa / mKesh / e-Mola
// cross-operator cash-in/cash-out fraud detection.

use crate::events::{DeviceFingerprint, LocationData, TransactionEvent};

use super::{DeviceContextAnalysis, LocationAnalysis, MobileMoneyAnalysis, PhoneValidation, PolicyOverlay, RegionalAnalyzer};

const SAME_AGENT_CASH_IN_OUT_WINDOW_SECS: i64 = 9 * 60;
const SAME_AGENT_CASH_IN_OUT_SCORE: f64 = 0.35;
const RAPID_CASH_IN_CASH_OUT_SCORE: f64 = 0.4;
const UNUSUAL_AMOUNT_MULTIPLE: f64 = 3.0;
const UNUSUAL_AMOUNT_FLOOR: f64 = 500.0;
const RECORD_AMOUNT_MULTIPLE: f64 = 1.5;
const RECORD_AMOUNT_FLOOR: f64 = 1000.0;

const OPERATORS: &[&str] = &["m-pesa", "mkesh", "e-mola"];

fn is_cash_out(channel: &str) -> bool {
    channel == "mobile_money_cash_out"
}

fn is_cash_in(channel: &str) -> bool {
    channel == "mobile_money_cash_in"
}

fn history_stats(history: &[TransactionEvent]) -> (f64, f64, usize) {
    if history.is_empty() {
        return (0.0, 0.0, 0);
    }
    let sum: f64 = history.iter().map(|t| t.amount).sum();
    let max = history.iter().map(|t| t.amount).fold(0.0_f64, f64::max);
    (sum / history.len() as f64, max, history.len())
}

pub struct MozambiqueAnalyzer;

impl RegionalAnalyzer for MozambiqueAnalyzer {
    fn region_code(&self) -> &'static str {
        "MZ"
    }

    fn analyze_location(&self, location: &LocationData) -> LocationAnalysis {
        let is_high_risk = location.country_code != "MZ";
        let mut flags = Vec::new();
        if is_high_risk {
            flags.push("cross_border_transaction".to_string());
        }
        LocationAnalysis { risk: if is_high_risk { 0.5 } else { 0.1 }, is_high_risk, is_urban: false, flags }
    }

    fn validate_phone(&self, number: &str) -> PhoneValidation {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        let national = digits.strip_prefix("258").map(str::to_string).unwrap_or(digits.clone());
        // Mozambican mobile ranges: 82/83 (Vodacom/M-Pesa), 84/85 (mCel/mKesh), 86/87 (Movitel/e-Mola).
        let operator = match national.get(0..2) {
            Some("82") | Some("83") => Some("m-pesa".to_string()),
            Some("84") | Some("85") => Some("mkesh".to_string()),
            Some("86") | Some("87") => Some("e-mola".to_string()),
            _ => None,
        };
        let valid = national.len() == 9 && operator.is_some();
        PhoneValidation { valid, operator, format: "+258 8XXXXXXXX".to_string() }
    }

    fn analyze_mobile_money_or_pix(&self, tx: &TransactionEvent, history: &[TransactionEvent]) -> MobileMoneyAnalysis {
        let mut flags = Vec::new();
        let mut risk: f64 = 0.0;

        let (avg, max, n) = history_stats(history);
        if n >= 3 && tx.amount > avg * UNUSUAL_AMOUNT_MULTIPLE && tx.amount > UNUSUAL_AMOUNT_FLOOR {
            flags.push("unusual_amount".to_string());
            risk += 0.3;
        }
        if n >= 3 && tx.amount > max * RECORD_AMOUNT_MULTIPLE && tx.amount > RECORD_AMOUNT_FLOOR {
            flags.push("record_amount".to_string());
            risk += 0.5;
        }

        // same_agent_cash_in_out and rapid_cash_in_cash_out are correlated, not
        // mutually exclusive: a cash-out shortly after a cash-in through the
        // same agent is both a rapid cycle and a same-agent cycle, and the two
        // signals accumulate rather than the stronger one alone standing in
        // for the pair.
        if is_cash_out(&tx.channel) {
            let recent_cash_in = history.iter().find(|t| {
                is_cash_in(&t.channel)
                    && (tx.metadata.timestamp - t.metadata.timestamp).num_seconds().abs()
                        <= SAME_AGENT_CASH_IN_OUT_WINDOW_SECS
            });
            if let Some(cash_in) = recent_cash_in {
                flags.push("rapid_cash_in_cash_out".to_string());
                risk += RAPID_CASH_IN_CASH_OUT_SCORE;

                if cash_in.agent_id.is_some() && cash_in.agent_id == tx.agent_id {
                    flags.push("same_agent_cash_in_out".to_string());
                    risk += SAME_AGENT_CASH_IN_OUT_SCORE;
                }
            }
        }

        let risk = risk.min(1.0);

        let recommendation = if risk >= 0.4 { "review" } else if risk > 0.0 { "monitor" } else { "none" };
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
            max_transactions_per_hour: Some(20),
            cross_region_mfa_required: true,
            high_risk_merchant_categories: vec!["money_transfer".to_string(), "gambling".to_string()],
        }
    }
}

pub fn known_operators() -> &'static [&'static str] {
    OPERATORS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventMetadata;
    use chrono::Utc;
    use std::collections::HashMap;

    fn mm_tx(channel: &str, amount: f64, agent_id: Option<&str>, operator: Option<&str>, ts: chrono::DateTime<Utc>) -> TransactionEvent {
        TransactionEvent {
            metadata: EventMetadata {
                event_id: "e".into(), tenant_id: "t".into(), timestamp: ts,
                region_code: Some("MZ".into()), extra: HashMap::new(),
            },
            user_id: "u1".into(),
            transaction_id: "tx".into(),
            amount,
            currency: "MZN".into(),
            channel: channel.to_string(),
            counterparty: None,
            agent_id: agent_id.map(String::from),
            operator: operator.map(String::from),
            ip: None,
            device: None,
            location: None,
        }
    }

    #[test]
    fn scenario_s4_same_agent_cash_in_out() {
        let now = Utc::now();
        let cash_in = mm_tx("mobile_money_cash_in", 3000.0, Some("agent-7"), Some("m-pesa"), now - chrono::Duration::minutes(5));
        let cash_out = mm_tx("mobile_money_cash_out", 3000.0, Some("agent-7"), Some("m-pesa"), now);
        let analysis = MozambiqueAnalyzer.analyze_mobile_money_or_pix(&cash_out, &[cash_in]);
        assert!(analysis.flags.contains(&"same_agent_cash_in_out".to_string()));
        assert!(analysis.flags.contains(&"rapid_cash_in_cash_out".to_string()));
        assert_eq!(analysis.risk, SAME_AGENT_CASH_IN_OUT_SCORE + RAPID_CASH_IN_CASH_OUT_SCORE);
        assert!(analysis.risk >= 0.7);
    }

    #[test]
    fn scenario_s4_cross_operator_rapid_cash_out() {
        let now = Utc::now();
        let cash_in = mm_tx("mobile_money_cash_in", 3000.0, Some("agent-1"), Some("mkesh"), now - chrono::Duration::minutes(3));
        let cash_out = mm_tx("mobile_money_cash_out", 3000.0, Some("agent-9"), Some("e-mola"), now);
        let analysis = MozambiqueAnalyzer.analyze_mobile_money_or_pix(&cash_out, &[cash_in]);
        assert!(analysis.flags.contains(&"rapid_cash_in_cash_out".to_string()));
    }

    #[test]
    fn no_history_is_clean() {
        let now = Utc::now();
        let tx = mm_tx("mobile_money_cash_out", 500.0, None, None, now);
        let analysis = MozambiqueAnalyzer.analyze_mobile_money_or_pix(&tx, &[]);
        assert!(analysis.flags.is_empty());
    }
}
