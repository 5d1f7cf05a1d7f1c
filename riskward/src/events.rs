// riskward/src/events.rs
//
// Shared domain types flowing through the risk pipeline: the normalized
// event union consumed by C7/C8, the per-request AuthContext enriched by
// C1, and the RiskSignal/RiskAssessment types produced by C2–C5.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AdaptivePolicy;

// ── Risk signal ────────────────────────────────────────────────────────────

/// A numeric risk contribution in [0,1], or a boolean (mapped to 0/1 by the
/// aggregator). Non-numeric values are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Number(f64),
    Bool(bool),
}

impl SignalValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Bool(b) => if *b { 1.0 } else { 0.0 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSignal {
    #[serde(rename = "type")]
    pub signal_type: String,
    pub value: SignalValue,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl RiskSignal {
    pub fn new(signal_type: impl Into<String>, value: f64, confidence: f64) -> Self {
        Self {
            signal_type: signal_type.into(),
            value: SignalValue::Number(value),
            confidence,
            timestamp: Utc::now(),
        }
    }
}

// ── Risk level ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ── Auth factor ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AuthFactor {
    Password,
    Totp,
    Sms,
    Email,
    Push,
    Biometric,
    Certificate,
    HardwareToken,
    SpatialGesture,
    GazePattern,
    Environment,
    Biometric3D,
    /// Forward-compatible catch-all. Never satisfies a requirement.
    #[serde(other)]
    Unknown,
}

// ── Device / location ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    pub device_id: String,
    pub user_agent: String,
    pub os: String,
    pub browser: String,
    pub screen: Option<String>,
    pub timezone: Option<String>,
    pub language: Option<String>,
    pub canvas: Option<String>,
    pub webgl: Option<String>,
    pub font: Option<String>,
    pub hw_concurrency: Option<u32>,
    pub trusted: bool,
    pub last_seen: DateTime<Utc>,
    pub risk_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationData {
    pub ip: IpAddr,
    pub country_code: String,
    pub region: Option<String>,
    pub city: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub isp: Option<String>,
    pub is_vpn: bool,
    pub is_proxy: bool,
    pub is_hosting: bool,
    pub is_tor: bool,
    pub confidence: f64,
}

// ── AR sub-bundles (spec §4.2 ar_* processors) ────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArData {
    pub spatial_gesture: Option<Vec<f64>>,
    pub gaze_pattern: Option<Vec<f64>>,
    pub environment: Option<Vec<f64>>,
    pub biometric_3d: Option<Vec<f64>>,
}

// ── AuthContext ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: String,
    pub tenant_id: String,
    pub session_id: Option<String>,
    pub ip: IpAddr,
    pub device_data: DeviceFingerprint,
    pub location_data: LocationData,
    pub auth_method: Option<AuthFactor>,
    pub ar_data: Option<ArData>,
    pub timestamp: DateTime<Utc>,
    /// Set by the caller from the credential-bureau connector before C2 runs;
    /// the credential_anomaly processor itself makes no external calls.
    #[serde(default)]
    pub breached_credential: bool,
    #[serde(skip)]
    pub tenant_config_snapshot: Option<Arc<AdaptivePolicy>>,
}

// ── RiskAssessment (C4/C5 output) ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub assessment_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub ip: IpAddr,
    pub device_fp: DeviceFingerprint,
    pub location: LocationData,
    pub signals: Vec<RiskSignal>,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub required_factors: Vec<AuthFactor>,
    pub reason: String,
}

// ── Transaction verdict (C5 for transactions) ─────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionVerdict {
    Allow,
    Verify,
    Block,
}

// ── Normalized event union (C7/C8 input, §9 "Dynamic dicts") ──────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: String,
    pub tenant_id: String,
    pub timestamp: DateTime<Utc>,
    pub region_code: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationEvent {
    pub metadata: EventMetadata,
    pub user_id: String,
    pub ip: IpAddr,
    pub device: DeviceFingerprint,
    pub location: LocationData,
    pub auth_method: Option<AuthFactor>,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub metadata: EventMetadata,
    pub user_id: String,
    pub session_id: String,
    pub action: String, // "start" | "refresh" | "end"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub metadata: EventMetadata,
    pub user_id: String,
    pub device: DeviceFingerprint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivityEvent {
    pub metadata: EventMetadata,
    pub user_id: String,
    pub activity_type: String,
    pub ip: Option<IpAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub metadata: EventMetadata,
    pub user_id: String,
    pub transaction_id: String,
    pub amount: f64,
    pub currency: String,
    pub channel: String, // "pix" | "mobile_money" | "card" | "e_commerce" | ...
    pub counterparty: Option<String>,
    pub agent_id: Option<String>,
    pub operator: Option<String>,
    pub ip: Option<IpAddr>,
    pub device: Option<DeviceFingerprint>,
    pub location: Option<LocationData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEvent {
    pub metadata: EventMetadata,
    pub user_id: String,
    pub document_type: String,
    pub document_number: String,
    pub issued_country: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub ml_fraud_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Authentication(AuthenticationEvent),
    Session(SessionEvent),
    Device(DeviceEvent),
    UserActivity(UserActivityEvent),
    Transaction(TransactionEvent),
    Document(DocumentEvent),
}

impl Event {
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Event::Authentication(e) => &e.metadata,
            Event::Session(e) => &e.metadata,
            Event::Device(e) => &e.metadata,
            Event::UserActivity(e) => &e.metadata,
            Event::Transaction(e) => &e.metadata,
            Event::Document(e) => &e.metadata,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Event::Authentication(e) => &e.user_id,
            Event::Session(e) => &e.user_id,
            Event::Device(e) => &e.user_id,
            Event::UserActivity(e) => &e.user_id,
            Event::Transaction(e) => &e.user_id,
            Event::Document(e) => &e.user_id,
        }
    }
}

// ── Alerts (C9 input, built by consumers) ─────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub user_id: String,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub risk_score: f64,
    pub anomalies: Vec<String>,
    pub event_ref: String,
    pub tenant_id: String,
    pub region_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}
