// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Saved run profiles: named snapshots of a [`RunConfig`].

use std::time::Duration;

use sdc_core::{OperandMode, OperandSpec, RunConfig};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Key prefix under which profiles are stored.
pub const PROFILE_PREFIX: &str = "profile.";

/// Persisted form of an [`OperandSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperandProfile {
    /// `fixed` or `max`.
    pub mode: OperandMode,
    /// Fixed value or randomization maximum.
    pub value: u64,
    /// Randomization minimum.
    #[serde(default)]
    pub min: u64,
}

impl From<OperandSpec> for OperandProfile {
    fn from(spec: OperandSpec) -> Self {
        Self {
            mode: spec.mode,
            value: spec.value,
            min: spec.min,
        }
    }
}

impl From<OperandProfile> for OperandSpec {
    fn from(p: OperandProfile) -> Self {
        Self {
            mode: p.mode,
            value: p.value,
            min: p.min,
        }
    }
}

/// Persisted form of a [`RunConfig`]. Missing fields take the run defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunProfile {
    /// Iterations per cycle.
    pub iterations: u64,
    /// Worker count.
    pub threads: usize,
    /// Left-hand operand.
    pub operand1: OperandProfile,
    /// Right-hand operand.
    pub operand2: OperandProfile,
    /// Per-worker cycle cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u64>,
    /// Wall-clock bound in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl Default for RunProfile {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for RunProfile {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            iterations: cfg.iterations,
            threads: cfg.threads,
            operand1: cfg.operand1.into(),
            operand2: cfg.operand2.into(),
            max_cycles: cfg.max_cycles,
            duration_secs: cfg.duration.map(|d| d.as_secs()),
        }
    }
}

impl From<RunProfile> for RunConfig {
    fn from(p: RunProfile) -> Self {
        Self {
            iterations: p.iterations,
            threads: p.threads,
            operand1: p.operand1.into(),
            operand2: p.operand2.into(),
            max_cycles: p.max_cycles,
            duration: p.duration_secs.map(Duration::from_secs),
        }
    }
}

/// Named profile storage on top of a [`ConfigStore`].
#[derive(Debug)]
pub struct ProfileService<S> {
    config: ConfigService<S>,
}

impl<S: ConfigStore> ProfileService<S> {
    /// Wraps `store`.
    pub fn new(store: S) -> Self {
        Self {
            config: ConfigService::new(store),
        }
    }

    /// Loads profile `name`; `NotFound` when it was never saved.
    pub fn load(&self, name: &str) -> Result<RunProfile, ConfigError> {
        self.config
            .load(&key_for(name))?
            .ok_or_else(|| ConfigError::NotFound(name.to_owned()))
    }

    /// Saves `profile` as `name`, replacing any previous one.
    pub fn save(&self, name: &str, profile: &RunProfile) -> Result<(), ConfigError> {
        self.config.save(&key_for(name), profile)
    }

    /// Names of all saved profiles, sorted.
    pub fn names(&self) -> Result<Vec<String>, ConfigError> {
        self.config.keys_with_prefix(PROFILE_PREFIX)
    }
}

fn key_for(name: &str) -> String {
    format!("{PROFILE_PREFIX}{name}")
}
