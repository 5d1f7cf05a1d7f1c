// riskward/src/signals/time_pattern.rs
//
// Grounded on engine.py's TimePatternProcessor: flags authentication
// attempts in the local off-hours window [2,5].

use chrono::{Duration, Timelike};

use crate::events::{AuthContext, RiskSignal};

use super::{ProcessorInput, SignalProcessor};

/// Fixed standard-time UTC offsets for the tenant markets this core serves.
/// No IANA tz database is wired in (the pack carries no `chrono-tz`
/// dependency), so DST is not modeled; a parseable fixed offset on the
/// device fingerprint takes priority when present.
fn country_utc_offset_hours(country_code: &str) -> i64 {
    match country_code {
        "AO" => 1,  // WAT
        "BR" => -3, // BRT (São Paulo, the most populous zone)
        "MZ" => 2,  // CAT
        "PT" => 0,  // WET
        _ => 0,
    }
}

/// Parses a fixed-offset timezone string like `"+01:00"`, `"-03:00"` or
/// `"UTC+2"`. Returns `None` for IANA names (`"Africa/Luanda"`) or anything
/// else this core can't resolve without a tz database.
fn parse_fixed_offset(timezone: &Option<String>) -> Option<i64> {
    let tz = timezone.as_deref()?.trim();
    let tz = tz.strip_prefix("UTC").unwrap_or(tz);
    let (sign, rest) = match tz.chars().next()? {
        '+' => (1, &tz[1..]),
        '-' => (-1, &tz[1..]),
        _ => return None,
    };
    let hours: i64 = rest.split(':').next()?.parse().ok()?;
    Some(sign * hours)
}

fn local_hour(ctx: &AuthContext) -> u32 {
    let offset = parse_fixed_offset(&ctx.device_data.timezone)
        .unwrap_or_else(|| country_utc_offset_hours(&ctx.location_data.country_code));
    (ctx.timestamp + Duration::hours(offset)).hour()
}

pub struct TimePatternProcessor;

impl SignalProcessor for TimePatternProcessor {
    fn name(&self) -> &'static str {
        "time_pattern"
    }

    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal> {
        let hour = local_hour(input.ctx);
        if (2..=5).contains(&hour) {
            vec![RiskSignal::new("time_pattern", 0.6, 0.7)]
        } else {
            Vec::new()
        }
    }
}
