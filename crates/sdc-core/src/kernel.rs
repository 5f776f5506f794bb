// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Redundant multiply kernel.

use std::hint::black_box;

use crate::signal::FaultSignal;
use crate::task::WorkerTask;

/// The arithmetic under test.
///
/// Implementations must execute a fresh multiply on every call; the kernel
/// relies on two calls with identical inputs being two separate executions.
pub trait Multiplier: Send {
    /// Returns `lhs * rhs` with natural 64-bit wraparound.
    fn multiply(&mut self, lhs: u64, rhs: u64) -> u64;
}

/// The CPU's native 64-bit multiply.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeMultiplier;

impl Multiplier for NativeMultiplier {
    #[inline(never)]
    fn multiply(&mut self, lhs: u64, rhs: u64) -> u64 {
        // black_box on inputs and output stops the optimizer from folding the
        // second product into the first.
        black_box(black_box(lhs).wrapping_mul(black_box(rhs)))
    }
}

/// Why [`run_cycle`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The full iteration budget ran clean.
    Exhausted,
    /// The last iteration produced two different products.
    Diverged,
    /// The fault signal tripped mid-cycle.
    Stopped,
}

/// Runs one cycle of redundant multiplies over the task's current operands.
///
/// Each iteration overwrites both `result_a` and `result_b`, then checks for
/// divergence, then checks the signal, then the budget. At least one iteration
/// always runs, and a signal flip is observed at most one iteration late.
pub fn run_cycle<M: Multiplier + ?Sized>(
    task: &mut WorkerTask,
    multiplier: &mut M,
    signal: &FaultSignal,
) -> CycleOutcome {
    task.iterations_performed = 0;
    loop {
        task.iterations_performed += 1;
        task.result_a = multiplier.multiply(task.operand1, task.operand2);
        task.result_b = multiplier.multiply(task.operand1, task.operand2);
        if task.result_a != task.result_b {
            return CycleOutcome::Diverged;
        }
        if !signal.should_run() {
            return CycleOutcome::Stopped;
        }
        if task.iterations_performed >= task.iterations_budget {
            return CycleOutcome::Exhausted;
        }
    }
}
