// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Environment probe port (temperature / clock frequency).
//!
//! Adapters live outside the core (see `sdc-probe`). Sampling is best-effort:
//! a failing probe degrades the record, it never aborts reporting.

use thiserror::Error;
use tracing::warn;

/// A sensor could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The source does not exist or is unreadable on this host.
    #[error("probe unavailable: {0}")]
    Unavailable(String),
}

/// One best-effort environment sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSample {
    /// Core temperature, as reported by the source.
    pub temperature: Option<String>,
    /// Current clock frequency in MHz.
    pub frequency_mhz: Option<String>,
}

/// Source of temperature and clock frequency readings.
pub trait EnvironmentProbe: Sync {
    /// Current core temperature.
    fn temperature(&self) -> Result<String, ProbeError>;

    /// Current clock frequency in MHz.
    fn frequency_mhz(&self) -> Result<String, ProbeError>;

    /// Samples both readings, logging and dropping whichever fails.
    fn sample(&self) -> EnvironmentSample {
        EnvironmentSample {
            temperature: self
                .temperature()
                .map_err(|err| warn!(%err, "temperature sample failed"))
                .ok(),
            frequency_mhz: self
                .frequency_mhz()
                .map_err(|err| warn!(%err, "frequency sample failed"))
                .ok(),
        }
    }
}
