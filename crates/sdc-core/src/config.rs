// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Run configuration and its up-front validation.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default operand value (fixed value or randomization maximum).
pub const DEFAULT_OPERAND: u64 = 0x1_0000_0000;
/// Default iterations per operand-regeneration cycle.
pub const DEFAULT_ITERATIONS: u64 = 1000;
/// Default worker count.
pub const DEFAULT_THREADS: usize = 1;
/// Upper bound on the worker count.
pub const MAX_THREADS: usize = 4096;

/// How an operand evolves across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandMode {
    /// The configured value is used for every iteration.
    #[serde(rename = "fixed")]
    Fixed,
    /// A fresh value below the configured maximum is drawn every cycle.
    #[serde(rename = "max")]
    Randomized,
}

impl FromStr for OperandMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "max" => Ok(Self::Randomized),
            other => Err(ConfigError::InvalidMode(other.to_owned())),
        }
    }
}

impl fmt::Display for OperandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fixed => "fixed",
            Self::Randomized => "max",
        })
    }
}

/// Identifies one of the two multiplication operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandSlot {
    /// Left-hand operand.
    Operand1,
    /// Right-hand operand.
    Operand2,
}

impl fmt::Display for OperandSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Operand1 => "operand1",
            Self::Operand2 => "operand2",
        })
    }
}

/// Configuration of a single operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandSpec {
    /// Fixed or randomized.
    pub mode: OperandMode,
    /// The fixed value, or the exclusive randomization maximum.
    pub value: u64,
    /// Lower bound when randomized. Ignored in fixed mode.
    pub min: u64,
}

impl OperandSpec {
    /// An operand pinned to `value`.
    pub const fn fixed(value: u64) -> Self {
        Self {
            mode: OperandMode::Fixed,
            value,
            min: 0,
        }
    }

    /// An operand drawn from `[min, max)` every cycle.
    pub const fn randomized(max: u64, min: u64) -> Self {
        Self {
            mode: OperandMode::Randomized,
            value: max,
            min,
        }
    }

    /// Rejects randomized operands whose range is empty.
    pub fn validate(&self, slot: OperandSlot) -> Result<(), ConfigError> {
        if self.mode == OperandMode::Randomized && self.value <= self.min {
            return Err(ConfigError::EmptyRange {
                slot,
                min: self.min,
                max: self.value,
            });
        }
        Ok(())
    }
}

impl Default for OperandSpec {
    fn default() -> Self {
        Self::randomized(DEFAULT_OPERAND, 0)
    }
}

/// Everything the coordinator needs to run a hunt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Iterations per operand-regeneration cycle.
    pub iterations: u64,
    /// Number of worker threads.
    pub threads: usize,
    /// Left-hand operand.
    pub operand1: OperandSpec,
    /// Right-hand operand.
    pub operand2: OperandSpec,
    /// Per-worker cap on completed cycles. `None` runs until stopped.
    pub max_cycles: Option<u64>,
    /// Wall-clock bound after which the coordinator requests a stop.
    pub duration: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            threads: DEFAULT_THREADS,
            operand1: OperandSpec::default(),
            operand2: OperandSpec::default(),
            max_cycles: None,
            duration: None,
        }
    }
}

impl RunConfig {
    /// Checks the configuration. Called by [`Coordinator::new`](crate::Coordinator::new).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::NoThreads);
        }
        if self.threads > MAX_THREADS {
            return Err(ConfigError::TooManyThreads {
                requested: self.threads,
                max: MAX_THREADS,
            });
        }
        if let Some(limit) = self.duration {
            if Instant::now().checked_add(limit).is_none() {
                return Err(ConfigError::DurationTooLong(limit));
            }
        }
        if self.iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        self.operand1.validate(OperandSlot::Operand1)?;
        self.operand2.validate(OperandSlot::Operand2)
    }

    /// True when at least one operand consumes randomness.
    pub fn needs_rng(&self) -> bool {
        self.operand1.mode == OperandMode::Randomized
            || self.operand2.mode == OperandMode::Randomized
    }
}
