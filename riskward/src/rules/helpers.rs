// riskward/src/rules/helpers.rs
//
// Pure helper functions available to rule conditions — the full table from
// rule_engine.py's `helper_functions` (plus `ends_with`, carried from the
// source even though the distilled spec only names a subset; see
// SPEC_FULL.md §3). No I/O, no allocation beyond the inputs given.

/// Glob-style match: `*` matches any run of characters, everything else is
/// literal. Kept dependency-free rather than pulling in a regex crate for a
/// predicate language that only needs wildcards.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    fn match_at(value: &[u8], pattern: &[u8]) -> bool {
        match pattern.first() {
            None => value.is_empty(),
            Some(b'*') => {
                (0..=value.len()).any(|i| match_at(&value[i..], &pattern[1..]))
            }
            Some(&c) => value.first() == Some(&c) && match_at(&value[1..], &pattern[1..]),
        }
    }
    match_at(value.as_bytes(), pattern.as_bytes())
}

pub fn is_in(value: &str, set: &[String]) -> bool {
    set.iter().any(|s| s == value)
}

pub fn contains(value: &str, needle: &str) -> bool {
    value.contains(needle)
}

pub fn starts_with(value: &str, prefix: &str) -> bool {
    value.starts_with(prefix)
}

pub fn ends_with(value: &str, suffix: &str) -> bool {
    value.ends_with(suffix)
}

/// `hour` is local hour-of-day (0-23); business hours are 9-17 Mon-Fri is
/// enforced by also checking the weekday via `is_weekend` at the call site —
/// kept as a separate helper per rule_engine.py's split.
pub fn is_business_hours(hour: u32) -> bool {
    (9..18).contains(&hour)
}

/// `day` is ISO weekday with Monday=0 .. Sunday=6.
pub fn is_weekend(day: u32) -> bool {
    day >= 5
}

pub fn is_high_risk_country(country_code: &str, high_risk: &[String]) -> bool {
    high_risk.iter().any(|c| c == country_code)
}

/// Minutes between two Unix-epoch-seconds values (end - start), always
/// non-negative.
pub fn time_diff_minutes(start_epoch_secs: f64, end_epoch_secs: f64) -> f64 {
    ((end_epoch_secs - start_epoch_secs) / 60.0).abs()
}

pub fn get_or_default(value: Option<f64>, default: f64) -> f64 {
    value.unwrap_or(default)
}

pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn max(a: f64, b: f64) -> f64 {
    a.max(b)
}

pub fn min(a: f64, b: f64) -> f64 {
    a.min(b)
}
