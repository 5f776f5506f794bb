// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use sdc_core::{EnvironmentProbe, Multiplier, ProbeError};

/// Software stand-in for the hardware multiply. Never diverges.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareMultiplier;

impl Multiplier for SoftwareMultiplier {
    fn multiply(&mut self, lhs: u64, rhs: u64) -> u64 {
        lhs.wrapping_mul(rhs)
    }
}

/// Flips `mask` into the result of call number `on_call` (1-based), and only
/// that call. Calls come in pairs per iteration, so an even `on_call` corrupts
/// `result_b` and leaves the later reference multiply intact.
#[derive(Debug, Clone)]
pub struct InjectingMultiplier {
    calls: u64,
    on_call: Option<u64>,
    mask: u64,
}

impl InjectingMultiplier {
    pub fn corrupt_call(on_call: u64, mask: u64) -> Self {
        Self {
            calls: 0,
            on_call: Some(on_call),
            mask,
        }
    }

    pub fn healthy() -> Self {
        Self {
            calls: 0,
            on_call: None,
            mask: 0,
        }
    }
}

impl Multiplier for InjectingMultiplier {
    fn multiply(&mut self, lhs: u64, rhs: u64) -> u64 {
        self.calls += 1;
        let product = lhs.wrapping_mul(rhs);
        if self.on_call == Some(self.calls) {
            product ^ self.mask
        } else {
            product
        }
    }
}

/// Probe returning fixed readings.
pub struct StaticProbe;

impl EnvironmentProbe for StaticProbe {
    fn temperature(&self) -> Result<String, ProbeError> {
        Ok("+51.0°C".into())
    }

    fn frequency_mhz(&self) -> Result<String, ProbeError> {
        Ok("2400".into())
    }
}

/// Probe that can read nothing.
pub struct DeadProbe;

impl EnvironmentProbe for DeadProbe {
    fn temperature(&self) -> Result<String, ProbeError> {
        Err(ProbeError::Unavailable("no sensors".into()))
    }

    fn frequency_mhz(&self) -> Result<String, ProbeError> {
        Err(ProbeError::Unavailable("no cpuinfo".into()))
    }
}
