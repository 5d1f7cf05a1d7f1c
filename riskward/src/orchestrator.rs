// riskward/src/orchestrator.rs
//
// Orchestrator (C10, optional AI-agents path). Runs a set of heterogeneous
// "agents" (rules, behavioural, ML) in parallel with a shared AgentContext,
// a global deadline bounding the fan-out, and a weighted final verdict.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::AdaptivePolicy;
use crate::events::AuthContext;
use crate::rules::Env;
use crate::state::BehavioralProfile;

#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub insights: Vec<String>,
    pub risk_factors: Vec<String>,
    pub indicators: Vec<String>,
}

impl AgentContext {
    pub fn merge(&mut self, other: AgentContext) {
        self.insights.extend(other.insights);
        self.risk_factors.extend(other.risk_factors);
        self.indicators.extend(other.indicators);
    }
}

#[derive(Debug, Clone)]
pub struct AgentInput<'a> {
    pub ctx: &'a AuthContext,
    pub profile: &'a BehavioralProfile,
    pub env: &'a Env,
    pub policy: &'a AdaptivePolicy,
    pub rule_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AgentOutput {
    pub risk: f64,
    pub context: AgentContext,
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, input: &AgentInput<'_>) -> AgentOutput;
}

pub struct RulesAgent;

#[async_trait]
impl Agent for RulesAgent {
    fn name(&self) -> &str {
        "rules"
    }

    async fn run(&self, input: &AgentInput<'_>) -> AgentOutput {
        let mut ctx = AgentContext::default();
        if input.rule_score > 0.0 {
            ctx.risk_factors.push("tenant_rule_triggered".into());
        }
        AgentOutput { risk: input.rule_score, context: ctx }
    }
}

pub struct BehavioralAgent;

#[async_trait]
impl Agent for BehavioralAgent {
    fn name(&self) -> &str {
        "behavioral"
    }

    async fn run(&self, input: &AgentInput<'_>) -> AgentOutput {
        let mut ctx = AgentContext::default();
        let mut risk: f64 = 0.0;
        if input.profile.auth_stats.consecutive_failures >= 3 {
            risk += 0.3;
            ctx.indicators.push("repeated_auth_failures".into());
        }
        if input.profile.is_unseen_device(&input.ctx.device_data.device_id) {
            risk += 0.2;
            ctx.insights.push("new_device".into());
        }
        AgentOutput { risk: risk.min(1.0), context: ctx }
    }
}

/// Feature extraction is fixed-size and model-free here — the same
/// "full interface, simulated backend" stance as the other external
/// connectors (spec.md §4.9 "ml_score? from C10 or an injected model with
/// fixed-size feature extraction").
pub struct MlAgent;

#[async_trait]
impl Agent for MlAgent {
    fn name(&self) -> &str {
        "ml"
    }

    async fn run(&self, input: &AgentInput<'_>) -> AgentOutput {
        let mut ctx = AgentContext::default();
        let failure_rate = if input.profile.auth_stats.total_attempts > 0 {
            input.profile.auth_stats.failures as f64 / input.profile.auth_stats.total_attempts as f64
        } else {
            0.0
        };
        let features = [
            failure_rate,
            if input.ctx.location_data.is_vpn { 1.0 } else { 0.0 },
            if input.ctx.location_data.is_tor { 1.0 } else { 0.0 },
        ];
        let risk = (features.iter().sum::<f64>() / features.len() as f64).clamp(0.0, 1.0);
        if risk > 0.5 {
            ctx.insights.push("ml_model_elevated_score".into());
        }
        AgentOutput { risk, context: ctx }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Review,
    Reject,
}

#[derive(Debug, Clone)]
pub struct OrchestratorResult {
    pub verdict: Verdict,
    pub total_risk: f64,
    pub decision_confidence: f64,
    pub context: AgentContext,
    pub agents_missed: Vec<String>,
}

pub struct Orchestrator {
    agents: Vec<Box<dyn Agent>>,
    deadline: Duration,
}

impl Orchestrator {
    pub fn new(agents: Vec<Box<dyn Agent>>, deadline: Duration) -> Self {
        Self { agents, deadline }
    }

    pub fn default_agents(deadline: Duration) -> Self {
        Self::new(vec![Box::new(RulesAgent), Box::new(BehavioralAgent), Box::new(MlAgent)], deadline)
    }

    pub async fn run(&self, input: AgentInput<'_>, threshold: f64) -> OrchestratorResult {
        let names: Vec<String> = self.agents.iter().map(|a| a.name().to_string()).collect();
        let fan_out = futures::future::join_all(self.agents.iter().map(|agent| agent.run(&input)));

        let mut total_risk = 0.0;
        let mut context = AgentContext::default();
        let mut agents_missed = Vec::new();
        let mut n = 0usize;

        match tokio::time::timeout(self.deadline, fan_out).await {
            Ok(outputs) => {
                for output in outputs {
                    total_risk += output.risk;
                    context.merge(output.context);
                    n += 1;
                }
            }
            Err(_) => {
                warn!(agents = ?names, "agent fan-out missed the shared deadline, contributing no signal");
                agents_missed = names;
            }
        }

        let total_risk = if n > 0 { total_risk / n as f64 } else { 0.0 };

        let (verdict, decision_confidence) = if total_risk <= 0.7 * threshold {
            (Verdict::Approve, 1.0 - total_risk)
        } else if total_risk > threshold {
            (Verdict::Reject, total_risk)
        } else {
            (Verdict::Review, 0.5 - (0.5 - total_risk).abs())
        };

        OrchestratorResult { verdict, total_risk, decision_confidence, context, agents_missed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AuthContext, DeviceFingerprint, LocationData};
    use crate::state::BehavioralProfile;
    use std::net::{IpAddr, Ipv4Addr};

    fn ctx() -> AuthContext {
        AuthContext {
            user_id: "u1".into(),
            tenant_id: "t1".into(),
            session_id: None,
            ip: IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
            device_data: DeviceFingerprint {
                device_id: "d1".into(), user_agent: "ua".into(), os: "linux".into(), browser: "fx".into(),
                screen: None, timezone: None, language: None, canvas: None, webgl: None, font: None,
                hw_concurrency: None, trusted: true, last_seen: chrono::Utc::now(), risk_score: 0.0,
            },
            location_data: LocationData {
                ip: IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), country_code: "BR".into(), region: None, city: None,
                lat: 0.0, lon: 0.0, isp: None, is_vpn: false, is_proxy: false, is_hosting: false, is_tor: false,
                confidence: 1.0,
            },
            auth_method: None,
            ar_data: None,
            timestamp: chrono::Utc::now(),
            breached_credential: false,
            tenant_config_snapshot: None,
        }
    }

    #[tokio::test]
    async fn clean_context_approves() {
        let policy = AdaptivePolicy::default();
        let profile = BehavioralProfile::new("u1");
        let context = ctx();
        let env = Env { values: Default::default(), high_risk_countries: vec![] };
        let input = AgentInput { ctx: &context, profile: &profile, env: &env, policy: &policy, rule_score: 0.0 };
        let orchestrator = Orchestrator::default_agents(Duration::from_secs(1));
        let result = orchestrator.run(input, 0.6).await;
        assert_eq!(result.verdict, Verdict::Approve);
        assert!(result.agents_missed.is_empty());
    }

    #[tokio::test]
    async fn missed_deadline_contributes_no_signal() {
        struct SlowAgent;
        #[async_trait::async_trait]
        impl Agent for SlowAgent {
            fn name(&self) -> &str {
                "slow"
            }
            async fn run(&self, _input: &AgentInput<'_>) -> AgentOutput {
                tokio::time::sleep(Duration::from_millis(50)).await;
                AgentOutput { risk: 1.0, context: AgentContext::default() }
            }
        }
        let policy = AdaptivePolicy::default();
        let profile = BehavioralProfile::new("u1");
        let context = ctx();
        let env = Env { values: Default::default(), high_risk_countries: vec![] };
        let input = AgentInput { ctx: &context, profile: &profile, env: &env, policy: &policy, rule_score: 0.0 };
        let orchestrator = Orchestrator::new(vec![Box::new(SlowAgent)], Duration::from_millis(1));
        let result = orchestrator.run(input, 0.6).await;
        assert_eq!(result.agents_missed, vec!["slow".to_string()]);
        assert_eq!(result.total_risk, 0.0);
    }
}
