// riskward/src/signals/ip_reputation.rs
//
// Grounded on engine.py's IPReputationProcessor: VPN/proxy/Tor and
// high-risk-country checks, each with their own fixed value/confidence.

use crate::events::RiskSignal;

use super::{ProcessorInput, SignalProcessor};

pub struct IpReputationProcessor;

impl SignalProcessor for IpReputationProcessor {
    fn name(&self) -> &'static str {
        "ip_reputation"
    }

    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal> {
        let loc = &input.ctx.location_data;
        let mut signals = Vec::new();

        if loc.is_vpn || loc.is_proxy || loc.is_tor {
            signals.push(RiskSignal::new("ip_reputation", 0.8, 0.9));
        }
        if input.policy.high_risk_countries.contains(&loc.country_code) {
            signals.push(RiskSignal::new("ip_reputation", 0.9, 0.95));
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdaptivePolicy;
    use crate::state::profile::BehavioralProfile;
    use crate::test_support::auth_context;

    #[test]
    fn vpn_and_high_risk_country_both_emit() {
        let policy = AdaptivePolicy::default();
        let mut c = auth_context("u1", true, "KP");
        c.location_data.is_vpn = true;
        let profile = BehavioralProfile::new("u1");
        let input = ProcessorInput { ctx: &c, profile: &profile, policy: &policy };
        let sigs = IpReputationProcessor.process(&input);
        assert_eq!(sigs.len(), 2);
    }

    #[test]
    fn clean_ip_emits_nothing() {
        let policy = AdaptivePolicy::default();
        let c = auth_context("u1", true, "PT");
        let profile = BehavioralProfile::new("u1");
        let input = ProcessorInput { ctx: &c, profile: &profile, policy: &policy };
        assert!(IpReputationProcessor.process(&input).is_empty());
    }
}
