// riskward/src/signals/geo_velocity.rs
//
// Grounded on engine.py's GeoVelocityProcessor: haversine distance between
// the current location and the last successful authentication, divided by
// elapsed time, compared against the tenant's geo-velocity threshold.

use crate::events::RiskSignal;

use super::{ProcessorInput, SignalProcessor};

const EARTH_RADIUS_KM: f64 = 6371.0;

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) =
        (lat1.to_radians(), lon1.to_radians(), lat2.to_radians(), lon2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

pub struct GeoVelocityProcessor;

impl SignalProcessor for GeoVelocityProcessor {
    fn name(&self) -> &'static str {
        "geo_velocity"
    }

    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal> {
        let prior = match &input.profile.last_auth_location {
            Some(p) => p,
            None => return Vec::new(),
        };

        let loc = &input.ctx.location_data;
        let elapsed_hours =
            (input.ctx.timestamp - prior.timestamp).num_seconds().max(1) as f64 / 3600.0;
        let distance_km = haversine_km(prior.lat, prior.lon, loc.lat, loc.lon);
        let velocity_kmh = distance_km / elapsed_hours;

        if velocity_kmh >= input.policy.geo_velocity_threshold_kmh {
            vec![RiskSignal::new("geo_velocity", 0.95, 0.85)]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdaptivePolicy;
    use crate::state::profile::{BehavioralProfile, LastAuthLocation};
    use crate::test_support::auth_context;
    use chrono::{Duration, Utc};

    #[test]
    fn impossible_travel_emits_signal() {
        let policy = AdaptivePolicy::default();
        let mut c = auth_context("u1", true, "BR");
        c.timestamp = Utc::now();
        c.location_data.lat = -23.55;
        c.location_data.lon = -46.63;

        let mut profile = BehavioralProfile::new("u1");
        profile.last_auth_location = Some(LastAuthLocation {
            lat: -8.84,
            lon: 13.23,
            country_code: "AO".into(),
            timestamp: c.timestamp - Duration::seconds(1800),
        });

        let input = ProcessorInput { ctx: &c, profile: &profile, policy: &policy };
        let sigs = GeoVelocityProcessor.process(&input);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].value.as_f64(), 0.95);
        assert_eq!(sigs[0].confidence, 0.85);
    }

    #[test]
    fn no_prior_location_emits_nothing() {
        let policy = AdaptivePolicy::default();
        let c = auth_context("u1", true, "BR");
        let profile = BehavioralProfile::new("u1");
        let input = ProcessorInput { ctx: &c, profile: &profile, policy: &policy };
        assert!(GeoVelocityProcessor.process(&input).is_empty());
    }
}
