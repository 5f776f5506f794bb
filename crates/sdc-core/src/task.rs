// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-worker task record.

use std::fmt;

use serde::Serialize;

use crate::config::{OperandSpec, RunConfig};
use crate::operand::{next_operand1, next_operand2};
use crate::rng::RandomSource;

/// Index of a worker within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WorkerId(usize);

impl WorkerId {
    /// Wraps a worker index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Zero-based worker index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of one worker. Owned exclusively by its thread while the run is live
/// and handed back to the coordinator at join.
///
/// `result_a` and `result_b` always come from the same iteration: the kernel
/// overwrites both before any comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerTask {
    /// Identity for reporting.
    pub worker_id: WorkerId,
    /// Left-hand operand currently under test.
    pub operand1: u64,
    /// Right-hand operand currently under test.
    pub operand2: u64,
    /// How `operand1` is produced.
    pub operand1_spec: OperandSpec,
    /// How `operand2` is produced.
    pub operand2_spec: OperandSpec,
    /// Iterations per cycle before operands are regenerated.
    pub iterations_budget: u64,
    /// Iterations run in the current cycle.
    pub iterations_performed: u64,
    /// First product of the last iteration.
    pub result_a: u64,
    /// Second product of the last iteration.
    pub result_b: u64,
    /// Cycles that ran their full budget without divergence.
    pub cycles_completed: u64,
}

impl WorkerTask {
    /// Independent copy of the run template for `worker_id`.
    pub fn from_config(worker_id: WorkerId, config: &RunConfig) -> Self {
        Self {
            worker_id,
            operand1: config.operand1.value,
            operand2: config.operand2.value,
            operand1_spec: config.operand1,
            operand2_spec: config.operand2,
            iterations_budget: config.iterations,
            iterations_performed: 0,
            result_a: 0,
            result_b: 0,
            cycles_completed: 0,
        }
    }

    /// Draws the operand pair for the next cycle. Fixed operands stay put.
    pub fn regenerate<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        self.operand1 = next_operand1(&self.operand1_spec, rng);
        self.operand2 = next_operand2(&self.operand2_spec, rng);
    }

    /// True when the last iteration produced two different products.
    pub fn diverged(&self) -> bool {
        self.result_a != self.result_b
    }
}
