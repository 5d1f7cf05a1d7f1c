// riskward/src/rules/mod.rs
//
// Rule Engine (C3). Evaluates tenant-configured predicate rules over an
// evaluation environment; a failing rule counts as "not triggered" and
// never aborts the batch (P8).

pub mod ast;
pub mod helpers;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use ast::{Condition, Env, Value};

const RULE_BUDGET: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub condition: Condition,
    pub risk_contribution: f64,
    pub market: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredRule {
    pub id: String,
    pub name: String,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEngineResult {
    pub triggered: Vec<TriggeredRule>,
    pub aggregate_score: f64,
    pub total: usize,
    pub triggered_count: usize,
}

pub struct RuleEngine;

impl RuleEngine {
    /// Applies only `enabled` rules matching `market` (or carrying no market
    /// restriction). A condition that panics or exceeds its wall-clock
    /// budget is logged and treated as not-triggered; it never surfaces as
    /// a failure to the caller (S6).
    pub fn evaluate(rules: &[Rule], env: &Env, market: &str) -> RuleEngineResult {
        if rules.is_empty() {
            return RuleEngineResult { triggered: Vec::new(), aggregate_score: 0.0, total: 0, triggered_count: 0 };
        }

        let mut triggered = Vec::new();
        let mut total_contribution = 0.0;

        for rule in rules {
            if !rule.enabled {
                continue;
            }
            if let Some(rule_market) = &rule.market {
                if rule_market != market {
                    continue; // mismatched market is a skip, not a failure
                }
            }

            let start = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| ast::eval(&rule.condition, env)));

            let fired = match outcome {
                Ok(fired) => {
                    if start.elapsed() > RULE_BUDGET {
                        warn!(rule_id = %rule.id, elapsed_us = start.elapsed().as_micros(),
                              "rule exceeded wall-clock budget, treated as not triggered");
                        false
                    } else {
                        fired
                    }
                }
                Err(_) => {
                    warn!(rule_id = %rule.id, "rule condition panicked, treated as not triggered");
                    false
                }
            };

            if fired {
                total_contribution += rule.risk_contribution;
                triggered.push(TriggeredRule {
                    id: rule.id.clone(),
                    name: rule.name.clone(),
                    contribution: rule.risk_contribution,
                });
            }
        }

        RuleEngineResult {
            triggered_count: triggered.len(),
            triggered,
            aggregate_score: total_contribution.min(1.0),
            total: rules.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, condition: Condition, contribution: f64, market: Option<&str>) -> Rule {
        Rule {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            condition,
            risk_contribution: contribution,
            market: market.map(String::from),
            enabled: true,
        }
    }

    #[test]
    fn empty_rule_set_yields_zero() {
        let result = RuleEngine::evaluate(&[], &Env::default(), "BR");
        assert_eq!(result.aggregate_score, 0.0);
        assert!(result.triggered.is_empty());
    }

    #[test]
    fn mismatched_market_is_a_skip() {
        let rules = vec![rule("r1", Condition::Always(true), 0.5, Some("AO"))];
        let result = RuleEngine::evaluate(&rules, &Env::default(), "BR");
        assert_eq!(result.triggered_count, 0);
    }

    #[test]
    fn aggregate_score_clamped_at_one() {
        let rules = vec![
            rule("r1", Condition::Always(true), 0.7, None),
            rule("r2", Condition::Always(true), 0.7, None),
        ];
        let result = RuleEngine::evaluate(&rules, &Env::default(), "BR");
        assert_eq!(result.aggregate_score, 1.0);
        assert_eq!(result.triggered_count, 2);
    }

    #[test]
    fn five_trigger_with_total_0_6_matches_scenario_s6() {
        let mut rules = vec![rule(
            "bad",
            Condition::NumGt { field: "x".into(), value: f64::NAN },
            0.9,
            None,
        )];
        // NaN comparisons never panic in Rust, so simulate S6's "one rule
        // raises" with a rule that always fails safely instead — the engine
        // contract under test is that the other five still all trigger.
        for i in 0..5 {
            rules.push(rule(&format!("ok{i}"), Condition::Always(true), 0.12, None));
        }
        let result = RuleEngine::evaluate(&rules, &Env::default(), "BR");
        assert_eq!(result.triggered_count, 5);
        assert!((result.aggregate_score - 0.6).abs() < 1e-9);
    }
}
