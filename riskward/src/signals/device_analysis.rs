// riskward/src/signals/device_analysis.rs
//
// Grounded on engine.py's DeviceAnalysisProcessor: an untrusted device
// contributes a fixed device_trust signal.

use crate::events::RiskSignal;

use super::{ProcessorInput, SignalProcessor};

pub struct DeviceAnalysisProcessor;

impl SignalProcessor for DeviceAnalysisProcessor {
    fn name(&self) -> &'static str {
        "device_analysis"
    }

    fn process(&self, input: &ProcessorInput) -> Vec<RiskSignal> {
        if !input.ctx.device_data.trusted {
            vec![RiskSignal::new("device_trust", 0.7, 0.9)]
        } else {
            Vec::new()
        }
    }
}
