// riskward/src/test_support.rs
//
// Shared fixture builders for unit tests across signals/rules/regional
// modules. Not compiled into the binary.

#![cfg(test)]

use chrono::Utc;

use crate::events::{AuthContext, DeviceFingerprint, LocationData};

pub fn device(trusted: bool) -> DeviceFingerprint {
    DeviceFingerprint {
        device_id: "d1".into(),
        user_agent: "ua".into(),
        os: "linux".into(),
        browser: "chrome".into(),
        screen: None,
        timezone: None,
        language: None,
        canvas: None,
        webgl: None,
        font: None,
        hw_concurrency: None,
        trusted,
        last_seen: Utc::now(),
        risk_score: 0.0,
    }
}

pub fn location(country_code: &str) -> LocationData {
    LocationData {
        ip: "1.2.3.4".parse().unwrap(),
        country_code: country_code.into(),
        region: None,
        city: None,
        lat: 0.0,
        lon: 0.0,
        isp: None,
        is_vpn: false,
        is_proxy: false,
        is_hosting: false,
        is_tor: false,
        confidence: 1.0,
    }
}

pub fn auth_context(user_id: &str, trusted_device: bool, country_code: &str) -> AuthContext {
    AuthContext {
        user_id: user_id.into(),
        tenant_id: "t1".into(),
        session_id: None,
        ip: "1.2.3.4".parse().unwrap(),
        device_data: device(trusted_device),
        location_data: location(country_code),
        auth_method: None,
        ar_data: None,
        timestamp: Utc::now(),
        breached_credential: false,
        tenant_config_snapshot: None,
    }
}
