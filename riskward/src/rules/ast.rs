// riskward/src/rules/ast.rs
//
// Tagged-variant predicate AST (spec §9 "Polymorphism over inheritance" —
// no string-eval). Conditions are closed, `#[derive(Deserialize)]` enums
// built the same way the teacher's `WorkerKind`/`ActionKind` are, so a
// tenant-configured rule can only express what this enum allows: no I/O,
// no network, no host access, by construction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::helpers;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    List(Vec<String>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

/// The evaluation environment: a flat map of named values drawn from the
/// enriched AuthContext, BehavioralAnalysis and tenant policy — mirrors the
/// `{context, behaviour, tenant, helpers}` environment from spec §4.3
/// without handing the condition a live reference to those structs.
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub values: HashMap<String, Value>,
    pub high_risk_countries: Vec<String>,
}

impl Env {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Always(bool),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    IsIn { field: String, set: Vec<String> },
    Contains { field: String, value: String },
    StartsWith { field: String, value: String },
    EndsWith { field: String, value: String },
    MatchesPattern { field: String, pattern: String },
    IsBusinessHours { field: String },
    IsWeekend { field: String },
    IsHighRiskCountry { field: String },
    NumGt { field: String, value: f64 },
    NumGte { field: String, value: f64 },
    NumLt { field: String, value: f64 },
    NumLte { field: String, value: f64 },
    TimeDiffMinutesGte { start_field: String, end_field: String, minutes: f64 },
}

/// Evaluation never I/Os, never panics on missing fields (treated as
/// non-matching) — genuine Rust panics (e.g. div-by-zero via safe_divide)
/// are impossible here because helpers::safe_divide already guards them.
pub fn eval(cond: &Condition, env: &Env) -> bool {
    match cond {
        Condition::Always(b) => *b,
        Condition::And(parts) => parts.iter().all(|c| eval(c, env)),
        Condition::Or(parts) => parts.iter().any(|c| eval(c, env)),
        Condition::Not(inner) => !eval(inner, env),
        Condition::IsIn { field, set } => env
            .get_str(field)
            .map(|v| helpers::is_in(v, set))
            .unwrap_or(false),
        Condition::Contains { field, value } => env
            .get_str(field)
            .map(|v| helpers::contains(v, value))
            .unwrap_or(false),
        Condition::StartsWith { field, value } => env
            .get_str(field)
            .map(|v| helpers::starts_with(v, value))
            .unwrap_or(false),
        Condition::EndsWith { field, value } => env
            .get_str(field)
            .map(|v| helpers::ends_with(v, value))
            .unwrap_or(false),
        Condition::MatchesPattern { field, pattern } => env
            .get_str(field)
            .map(|v| helpers::matches_pattern(v, pattern))
            .unwrap_or(false),
        Condition::IsBusinessHours { field } => env
            .get_f64(field)
            .map(|hour| helpers::is_business_hours(hour as u32))
            .unwrap_or(false),
        Condition::IsWeekend { field } => env
            .get_f64(field)
            .map(|day| helpers::is_weekend(day as u32))
            .unwrap_or(false),
        Condition::IsHighRiskCountry { field } => env
            .get_str(field)
            .map(|v| helpers::is_high_risk_country(v, &env.high_risk_countries))
            .unwrap_or(false),
        Condition::NumGt { field, value } => env.get_f64(field).map(|v| v > *value).unwrap_or(false),
        Condition::NumGte { field, value } => env.get_f64(field).map(|v| v >= *value).unwrap_or(false),
        Condition::NumLt { field, value } => env.get_f64(field).map(|v| v < *value).unwrap_or(false),
        Condition::NumLte { field, value } => env.get_f64(field).map(|v| v <= *value).unwrap_or(false),
        Condition::TimeDiffMinutesGte { start_field, end_field, minutes } => {
            match (env.get_f64(start_field), env.get_f64(end_field)) {
                (Some(start), Some(end)) => helpers::time_diff_minutes(start, end) >= *minutes,
                _ => false,
            }
        }
    }
}
