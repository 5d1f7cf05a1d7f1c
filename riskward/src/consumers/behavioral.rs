// riskward/src/consumers/behavioral.rs
//
// Behavioural consumer (C8). Normalizes authentication/session/device/
// user_activity events, enriches via C1, runs the C2-C5 chain, updates the
// profile, and emits an alert when the assessed risk clears
// `policy.alert_threshold`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::aggregator::{self, AggregationInput};
use crate::config::TenantConfig;
use crate::consumer::EventProcessor;
use crate::errors::{Result, RiskwardError};
use crate::events::{Alert, AlertSeverity, AuthContext, AuthenticationEvent, Event, RiskAssessment};
use crate::orchestrator::{AgentInput, Orchestrator};
use crate::policy;
use crate::rules::RuleEngine;
use crate::signals::{self, ProcessorInput};
use crate::state::ContextStore;

use super::build_env;

pub struct BehavioralConsumerProcessor {
    store: Arc<ContextStore>,
    tenant: TenantConfig,
    alerts_tx: mpsc::Sender<Alert>,
}

impl BehavioralConsumerProcessor {
    pub fn new(store: Arc<ContextStore>, tenant: TenantConfig, alerts_tx: mpsc::Sender<Alert>) -> Self {
        Self { store, tenant, alerts_tx }
    }

    async fn assess_authentication(&self, ev: &AuthenticationEvent) -> Result<RiskAssessment> {
        let policy = &self.tenant.policy;
        let ctx = AuthContext {
            user_id: ev.user_id.clone(),
            tenant_id: ev.metadata.tenant_id.clone(),
            session_id: None,
            ip: ev.ip,
            device_data: ev.device.clone(),
            location_data: ev.location.clone(),
            auth_method: ev.auth_method.clone(),
            ar_data: None,
            timestamp: ev.metadata.timestamp,
            breached_credential: false,
            tenant_config_snapshot: None,
        };

        let profile = self.store.get_profile(&ctx.user_id);
        let signals = signals::run_all(&ProcessorInput { ctx: &ctx, profile: &profile, policy });

        let env = build_env(&ctx, &profile, policy);
        let market = self.tenant.markets.first().cloned().unwrap_or_default();
        let rule_result = RuleEngine::evaluate(&self.tenant.rules, &env, &market);

        let ml_score = if policy.feature_toggles.orchestrator_agents {
            let orchestrator = Orchestrator::default_agents(Duration::from_millis(200));
            let agent_input = AgentInput {
                ctx: &ctx,
                profile: &profile,
                env: &env,
                policy,
                rule_score: rule_result.aggregate_score,
            };
            let result = orchestrator.run(agent_input, policy.alert_threshold).await;
            Some(result.total_risk)
        } else {
            None
        };

        let agg = aggregator::aggregate(
            &AggregationInput { signals: &signals, rule_score: Some(rule_result.aggregate_score), ml_score },
            policy,
        );

        let required_factors = policy::required_factors(agg.risk_level, policy);
        let reason = policy::build_reason(&signals);

        self.store.update_profile(
            &ctx.user_id,
            &ev.metadata.event_id,
            "authentication",
            ev.metadata.timestamp,
            &[],
            |p| {
                p.usual_locations.record(&ctx.location_data.country_code, ev.metadata.timestamp);
                p.usual_devices.record(&ctx.device_data.device_id, ev.metadata.timestamp);
                p.auth_stats.total_attempts += 1;
                if ev.success {
                    p.auth_stats.successes += 1;
                    p.auth_stats.consecutive_failures = 0;
                    p.last_auth_location = Some(crate::state::profile::LastAuthLocation {
                        lat: ctx.location_data.lat,
                        lon: ctx.location_data.lon,
                        country_code: ctx.location_data.country_code.clone(),
                        timestamp: ev.metadata.timestamp,
                    });
                } else {
                    p.auth_stats.failures += 1;
                    p.auth_stats.consecutive_failures += 1;
                }
            },
        );
        self.store.append_recent_event(&ctx.user_id, ev.metadata.timestamp, Event::Authentication(ev.clone()));

        let assessment = RiskAssessment {
            assessment_id: Uuid::new_v4().to_string(),
            user_id: ctx.user_id.clone(),
            session_id: ctx.session_id.clone(),
            timestamp: ev.metadata.timestamp,
            ip: ctx.ip,
            device_fp: ctx.device_data.clone(),
            location: ctx.location_data.clone(),
            signals,
            risk_level: agg.risk_level,
            risk_score: agg.risk_score,
            required_factors,
            reason: reason.clone(),
        };

        if assessment.risk_score >= policy.alert_threshold {
            let severity = match assessment.risk_level {
                crate::events::RiskLevel::Critical => AlertSeverity::Critical,
                crate::events::RiskLevel::High => AlertSeverity::High,
                crate::events::RiskLevel::Medium => AlertSeverity::Medium,
                crate::events::RiskLevel::Low => AlertSeverity::Low,
            };
            let alert = Alert {
                alert_id: Uuid::new_v4().to_string(),
                user_id: assessment.user_id.clone(),
                alert_type: "behavioral_anomaly".into(),
                severity,
                risk_score: assessment.risk_score,
                anomalies: vec![reason],
                event_ref: ev.metadata.event_id.clone(),
                tenant_id: ev.metadata.tenant_id.clone(),
                region_code: ev.metadata.region_code.clone(),
                timestamp: Utc::now(),
            };
            if self.alerts_tx.send(alert).await.is_err() {
                info!("alert channel closed, dropping alert");
            }
        }

        Ok(assessment)
    }
}

#[async_trait]
impl EventProcessor for BehavioralConsumerProcessor {
    async fn process_event(&self, _topic: &str, event: Event) -> Result<()> {
        match event {
            Event::Authentication(ev) => {
                self.assess_authentication(&ev).await?;
                Ok(())
            }
            Event::Session(ev) => {
                let user_id = ev.user_id.clone();
                let ts = ev.metadata.timestamp;
                self.store.append_recent_event(&user_id, ts, Event::Session(ev));
                Ok(())
            }
            Event::Device(ev) => {
                self.store.update_profile(&ev.user_id, &ev.metadata.event_id, "device", ev.metadata.timestamp, &[], |p| {
                    p.usual_devices.record(&ev.device.device_id, ev.metadata.timestamp);
                });
                Ok(())
            }
            Event::UserActivity(ev) => {
                let user_id = ev.user_id.clone();
                let ts = ev.metadata.timestamp;
                self.store.append_recent_event(&user_id, ts, Event::UserActivity(ev));
                Ok(())
            }
            other => Err(RiskwardError::UnusableSignal {
                signal_type: "behavioral_consumer".into(),
                reason: format!("event kind {:?} not handled by the behavioural consumer", other.metadata().event_id),
            }),
        }
    }
}
