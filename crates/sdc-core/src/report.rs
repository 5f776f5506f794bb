// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fault reporter: turns a diverged task into a [`DiagnosticRecord`].

use serde::{Serialize, Serializer};
use tracing::instrument;

use crate::kernel::Multiplier;
use crate::probe::EnvironmentProbe;
use crate::task::{WorkerId, WorkerTask};

/// Everything known about a detected divergence. Built once, by the worker
/// that won the reporting race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    /// Worker that observed the divergence.
    pub worker_id: WorkerId,
    /// Left-hand operand of the failing iteration.
    #[serde(serialize_with = "hex_u64")]
    pub operand1: u64,
    /// Right-hand operand of the failing iteration.
    #[serde(serialize_with = "hex_u64")]
    pub operand2: u64,
    /// Third, tie-breaking product taken as ground truth.
    #[serde(serialize_with = "hex_u64")]
    pub reference_result: u64,
    /// First product of the failing iteration.
    #[serde(serialize_with = "hex_u64")]
    pub observed_result_a: u64,
    /// Second product of the failing iteration.
    #[serde(serialize_with = "hex_u64")]
    pub observed_result_b: u64,
    /// `observed_result_a ^ observed_result_b`: the flipped bits.
    #[serde(serialize_with = "hex_u64")]
    pub xor_divergence: u64,
    /// Iterations into the cycle when the divergence appeared.
    pub iterations_performed: u64,
    /// Core temperature at report time, if the probe could read it.
    pub temperature: Option<String>,
    /// Clock frequency in MHz at report time, if the probe could read it.
    pub frequency_mhz: Option<String>,
}

impl DiagnosticRecord {
    /// Builds the record for a diverged `task`.
    ///
    /// Recomputes the product once more through the same multiplier, then
    /// samples the environment. Probe failures leave the fields empty.
    #[instrument(level = "debug", skip_all, fields(worker = %task.worker_id))]
    pub fn build<M, P>(task: &WorkerTask, multiplier: &mut M, probe: &P) -> Self
    where
        M: Multiplier + ?Sized,
        P: EnvironmentProbe + ?Sized,
    {
        let reference_result = multiplier.multiply(task.operand1, task.operand2);
        let env = probe.sample();
        Self {
            worker_id: task.worker_id,
            operand1: task.operand1,
            operand2: task.operand2,
            reference_result,
            observed_result_a: task.result_a,
            observed_result_b: task.result_b,
            xor_divergence: task.result_a ^ task.result_b,
            iterations_performed: task.iterations_performed,
            temperature: env.temperature,
            frequency_mhz: env.frequency_mhz,
        }
    }

    /// Observed products that disagree with the reference, in `a`, `b` order.
    pub fn mismatching_results(&self) -> impl Iterator<Item = u64> + '_ {
        [self.observed_result_a, self.observed_result_b]
            .into_iter()
            .filter(move |&r| r != self.reference_result)
    }
}

fn hex_u64<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{value:#018x}"))
}
