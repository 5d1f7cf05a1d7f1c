// riskward/src/consumers/mod.rs
//
// Specialized Consumers (C8). Each wires the C7 EventConsumer with a
// normalization step and a processing function over C1–C6.

pub mod behavioral;
pub mod document;
pub mod transaction;

use chrono::{Datelike, Timelike};

use crate::config::AdaptivePolicy;
use crate::events::AuthContext;
use crate::rules::{Env, Value};
use crate::state::BehavioralProfile;

/// Builds the rule-evaluation environment from an enriched context and the
/// user's behavioural profile — the `{context, behaviour, tenant}` flat
/// namespace spec §4.3 describes, minus live references to those structs.
pub fn build_env(ctx: &AuthContext, profile: &BehavioralProfile, policy: &AdaptivePolicy) -> Env {
    let mut values = std::collections::HashMap::new();
    values.insert("user_id".into(), Value::Str(ctx.user_id.clone()));
    values.insert("tenant_id".into(), Value::Str(ctx.tenant_id.clone()));
    values.insert("country_code".into(), Value::Str(ctx.location_data.country_code.clone()));
    values.insert("is_vpn".into(), Value::Bool(ctx.location_data.is_vpn));
    values.insert("is_proxy".into(), Value::Bool(ctx.location_data.is_proxy));
    values.insert("is_tor".into(), Value::Bool(ctx.location_data.is_tor));
    values.insert("device_trusted".into(), Value::Bool(ctx.device_data.trusted));
    values.insert("hour".into(), Value::Num(ctx.timestamp.hour() as f64));
    values.insert("day_of_week".into(), Value::Num(ctx.timestamp.weekday().num_days_from_monday() as f64));
    values.insert("consecutive_failures".into(), Value::Num(profile.auth_stats.consecutive_failures as f64));
    values.insert("breached_credential".into(), Value::Bool(ctx.breached_credential));
    values.insert("is_unseen_device".into(), Value::Bool(profile.is_unseen_device(&ctx.device_data.device_id)));
    values.insert(
        "is_unseen_location".into(),
        Value::Bool(profile.is_unseen_location(&ctx.location_data.country_code)),
    );
    Env { values, high_risk_countries: policy.high_risk_countries.clone() }
}
