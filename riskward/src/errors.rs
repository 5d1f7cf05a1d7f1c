// riskward/src/errors.rs
//
// Typed domain errors returned from module boundaries. Process/IO level
// failures (CLI, consumer main loop) use anyhow::Result; anything crossing
// a component contract (C1–C10) returns Result<_, RiskwardError> so callers
// can match on the error category from §7 of the design.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskwardError {
    /// Category 2 — fatal at startup, process exits with code 1.
    #[error("invalid policy for tenant {tenant_id}: {reason}")]
    InvalidPolicy { tenant_id: String, reason: String },

    #[error("missing regional table for region {0}")]
    MissingRegionTable(String),

    /// Category 3 — schema/decoding, non-fatal, counted.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Category 4 — business logic, signal dropped, not a hard failure.
    #[error("unusable signal {signal_type}: {reason}")]
    UnusableSignal { signal_type: String, reason: String },

    /// Category 5 — internal invariant violation, a defect.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Category 1 — transient external collaborator failure.
    #[error("external call to {target} failed: {reason}")]
    ExternalTransient { target: String, reason: String },

    #[error("rule {id} failed evaluation: {reason}")]
    RuleEvaluation { id: String, reason: String },

    #[error("unknown user {0}")]
    UnknownUser(String),
}

pub type Result<T> = std::result::Result<T, RiskwardError>;
