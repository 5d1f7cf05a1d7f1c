// riskward/src/consumers/transaction.rs
//
// Transaction consumer (C8). Maintains a sliding 1-hour window of recent
// transactions per user, runs velocity/amount/location/device/regional
// analyses, and computes is_suspicious/is_high_risk/block decisions.
// Automatic block is only recommended when risk >= 0.85 (spec §4.8).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::config::TenantConfig;
use crate::consumer::EventProcessor;
use crate::errors::{Result, RiskwardError};
use crate::events::{Alert, AlertSeverity, Event, TransactionEvent};
use crate::regional;
use crate::state::ContextStore;

const AUTO_BLOCK_THRESHOLD: f64 = 0.85;
const WINDOW_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct TransactionDecision {
    pub risk: f64,
    pub is_suspicious: bool,
    pub is_high_risk: bool,
    pub block: bool,
    pub flags: Vec<String>,
}

pub struct TransactionConsumerProcessor {
    store: Arc<ContextStore>,
    tenant: TenantConfig,
    alerts_tx: mpsc::Sender<Alert>,
}

impl TransactionConsumerProcessor {
    pub fn new(store: Arc<ContextStore>, tenant: TenantConfig, alerts_tx: mpsc::Sender<Alert>) -> Self {
        Self { store, tenant, alerts_tx }
    }

    fn recent_transactions(&self, user_id: &str, now: chrono::DateTime<Utc>) -> Vec<TransactionEvent> {
        self.store
            .recent_events_snapshot(user_id)
            .into_iter()
            .filter_map(|e| match e {
                Event::Transaction(tx) => Some(tx),
                _ => None,
            })
            .filter(|tx| (now - tx.metadata.timestamp).num_seconds() <= WINDOW_SECS)
            .collect()
    }

    fn assess(&self, tx: &TransactionEvent) -> Result<TransactionDecision> {
        let region_code = tx
            .metadata
            .region_code
            .clone()
            .ok_or_else(|| RiskwardError::MissingRegionTable("transaction missing region_code".into()))?;
        let analyzer = regional::for_region(&region_code)
            .ok_or_else(|| RiskwardError::MissingRegionTable(region_code.clone()))?;

        let history = self.recent_transactions(&tx.user_id, tx.metadata.timestamp);
        let money_analysis = analyzer.analyze_mobile_money_or_pix(tx, &history);

        // Sub-analyses accumulate rather than take the max of each other: a
        // transaction that is both mobile-money-suspicious and from a
        // high-risk location is more suspicious than either fact alone, and
        // S4's cash-in/cash-out scenario depends on it (the mobile-money
        // analysis itself already accumulates its own correlated flags).
        let mut risk = money_analysis.risk;
        let mut flags = money_analysis.flags;

        if let Some(location) = &tx.location {
            let loc_analysis = analyzer.analyze_location(location);
            if loc_analysis.is_high_risk {
                risk += loc_analysis.risk;
                flags.extend(loc_analysis.flags);
            }
        }

        if let Some(device) = &tx.device {
            let history_devices: Vec<_> = Vec::new();
            let dev_analysis = analyzer.analyze_device_context(device, &history_devices);
            risk += dev_analysis.risk;
            flags.extend(dev_analysis.flags);
        }

        let risk = risk.min(1.0);
        let is_suspicious = risk >= self.tenant.policy.alert_threshold;
        let is_high_risk = risk >= self.tenant.policy.risk_thresholds.high;
        let block = risk >= AUTO_BLOCK_THRESHOLD;

        Ok(TransactionDecision { risk, is_suspicious, is_high_risk, block, flags })
    }
}

#[async_trait]
impl EventProcessor for TransactionConsumerProcessor {
    async fn process_event(&self, _topic: &str, event: Event) -> Result<()> {
        let tx = match event {
            Event::Transaction(tx) => tx,
            other => {
                return Err(RiskwardError::UnusableSignal {
                    signal_type: "transaction_consumer".into(),
                    reason: format!("event kind not a transaction: {}", other.metadata().event_id),
                })
            }
        };

        let decision = self.assess(&tx)?;

        self.store.update_profile(
            &tx.user_id,
            &tx.metadata.event_id,
            "transaction",
            tx.metadata.timestamp,
            &decision.flags,
            |p| p.transaction_baseline.update(tx.amount),
        );
        self.store.append_recent_event(&tx.user_id, tx.metadata.timestamp, Event::Transaction(tx.clone()));

        if decision.is_suspicious {
            let severity = if decision.block {
                AlertSeverity::Critical
            } else if decision.is_high_risk {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            };
            let alert = Alert {
                alert_id: Uuid::new_v4().to_string(),
                user_id: tx.user_id.clone(),
                alert_type: if decision.block { "transaction_blocked".into() } else { "transaction_suspicious".into() },
                severity,
                risk_score: decision.risk,
                anomalies: decision.flags.clone(),
                event_ref: tx.metadata.event_id.clone(),
                tenant_id: tx.metadata.tenant_id.clone(),
                region_code: tx.metadata.region_code.clone(),
                timestamp: Utc::now(),
            };
            if self.alerts_tx.send(alert).await.is_err() {
                info!("alert channel closed, dropping alert");
            }
        }

        Ok(())
    }
}
