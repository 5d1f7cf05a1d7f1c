// riskward/src/regional/mod.rs
//
// Regional Analyzer (C6). Per-region modules expose the same four-method
// contract over hard-coded province/carrier/limit tables read at boot; no
// code path branches on country beyond which table is consulted.

pub mod angola;
pub mod brazil;
pub mod mozambique;
pub mod portugal;

use crate::events::{DeviceFingerprint, LocationData, TransactionEvent};

#[derive(Debug, Clone, Default)]
pub struct LocationAnalysis {
    pub risk: f64,
    pub is_high_risk: bool,
    pub is_urban: bool,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PhoneValidation {
    pub valid: bool,
    pub operator: Option<String>,
    pub format: String,
}

#[derive(Debug, Clone, Default)]
pub struct MobileMoneyAnalysis {
    pub risk: f64,
    pub flags: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceContextAnalysis {
    pub risk: f64,
    pub flags: Vec<String>,
}

/// Merged into the tenant policy at load time.
#[derive(Debug, Clone, Default)]
pub struct PolicyOverlay {
    pub max_transactions_per_hour: Option<u32>,
    pub cross_region_mfa_required: bool,
    pub high_risk_merchant_categories: Vec<String>,
}

pub trait RegionalAnalyzer: Send + Sync {
    fn region_code(&self) -> &'static str;
    fn analyze_location(&self, location: &LocationData) -> LocationAnalysis;
    fn validate_phone(&self, number: &str) -> PhoneValidation;
    fn analyze_mobile_money_or_pix(
        &self,
        tx: &TransactionEvent,
        history: &[TransactionEvent],
    ) -> MobileMoneyAnalysis;
    fn analyze_device_context(&self, device: &DeviceFingerprint, history: &[DeviceFingerprint]) -> DeviceContextAnalysis;
    fn get_regional_rules(&self) -> PolicyOverlay;
}

pub fn for_region(code: &str) -> Option<Box<dyn RegionalAnalyzer>> {
    match code {
        "AO" => Some(Box::new(angola::AngolaAnalyzer)),
        "BR" => Some(Box::new(brazil::BrazilAnalyzer)),
        "MZ" => Some(Box::new(mozambique::MozambiqueAnalyzer)),
        "PT" => Some(Box::new(portugal::PortugalAnalyzer)),
        _ => None,
    }
}
