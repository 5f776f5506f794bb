// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Silent data corruption hunting core.
//!
//! `sdc-core` stresses the integer multiplier with redundant computation: every
//! worker multiplies the same operand pair twice per iteration and compares the
//! two products. On a healthy core they always agree, wraparound included. When
//! they do not, the first worker to notice claims the report, builds a
//! [`DiagnosticRecord`], and every other worker winds down.
//!
//! # Concurrency Model
//!
//! - One scoped OS thread per [`WorkerTask`], created once and joined once.
//! - Task state is owned by its worker; nothing is shared except the
//!   [`FaultSignal`].
//! - The signal's flags are atomics with acquire/release ordering, and the
//!   right to report is a single compare-and-swap on `fault_detected`.
//!
//! # Seams
//!
//! Randomness ([`RandomSource`]), the multiply itself ([`Multiplier`]), and
//! the temperature/frequency sampling ([`EnvironmentProbe`]) are traits so the
//! coordinator can be driven deterministically from tests.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod kernel;
pub mod operand;
pub mod probe;
pub mod report;
pub mod rng;
pub mod signal;
pub mod task;

pub use config::{OperandMode, OperandSlot, OperandSpec, RunConfig, MAX_THREADS};
pub use coordinator::{Coordinator, ExitStatus, RunOutcome};
pub use error::{ConfigError, RngUnavailable, SdcError};
pub use kernel::{run_cycle, CycleOutcome, Multiplier, NativeMultiplier};
pub use operand::{next_operand1, next_operand2, OPERAND2_OFFSET};
pub use probe::{EnvironmentProbe, EnvironmentSample, ProbeError};
pub use report::DiagnosticRecord;
pub use rng::{HardwareRng, RandomSource, RngFactory, RngPolicy, WorkerRng, XorShiftRng};
pub use signal::{FaultSignal, ReportClaim};
pub use task::{WorkerId, WorkerTask};
