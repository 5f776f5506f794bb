// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for a hunt run.
//!
//! A detected fault is not an error: it is reported through
//! [`RunOutcome`](crate::RunOutcome). Probe failures are not fatal either and
//! live in [`ProbeError`](crate::ProbeError).

use thiserror::Error;

use crate::config::OperandSlot;

/// Invalid run configuration. Always raised before any worker starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The worker pool would be empty.
    #[error("thread count must be at least 1")]
    NoThreads,
    /// A cycle must run at least one iteration.
    #[error("iteration budget must be at least 1")]
    NoIterations,
    /// A randomized operand has no values to draw from.
    #[error("{slot} randomization range is empty: min {min:#x} is not below max {max:#x}")]
    EmptyRange {
        /// Which operand is misconfigured.
        slot: OperandSlot,
        /// Configured minimum.
        min: u64,
        /// Configured maximum.
        max: u64,
    },
    /// More workers than a run will ever spawn.
    #[error("thread count {requested} exceeds the limit of {max}")]
    TooManyThreads {
        /// Requested worker count.
        requested: usize,
        /// Largest accepted worker count.
        max: usize,
    },
    /// The wall-clock bound does not fit in an `Instant`.
    #[error("run duration of {0:?} is too long to schedule")]
    DurationTooLong(std::time::Duration),
    /// Operand mode spelled as something other than `fixed` or `max`.
    #[error("invalid operand mode {0:?} (expected `fixed` or `max`)")]
    InvalidMode(String),
}

/// The hardware random number instruction is missing on this CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("hardware random number generator (RDRAND) is not available on this CPU")]
pub struct RngUnavailable;

/// Any fatal condition that prevents a run from starting or finishing.
#[derive(Debug, Error)]
pub enum SdcError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`RngUnavailable`].
    #[error(transparent)]
    Rng(#[from] RngUnavailable),
    /// The OS refused to create a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
