// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Forced divergences: single report, prompt shutdown, trusted reference.
#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicU64, Ordering};

use sdc_core::{
    Coordinator, ExitStatus, FaultSignal, Multiplier, OperandSpec, RunConfig, WorkerId,
    XorShiftRng,
};

mod common;
use common::{DeadProbe, InjectingMultiplier, StaticProbe};

const MASK: u64 = 0x0000_0100_0000_0000;

/// Counts multiplies issued once the fault flag is already visible.
struct LateCallCounter<'a> {
    inner: InjectingMultiplier,
    signal: &'a FaultSignal,
    late_calls: &'a AtomicU64,
}

impl Multiplier for LateCallCounter<'_> {
    fn multiply(&mut self, lhs: u64, rhs: u64) -> u64 {
        if self.signal.fault_detected() {
            self.late_calls.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.multiply(lhs, rhs)
    }
}

fn endless(threads: usize, lhs: u64, rhs: u64) -> RunConfig {
    RunConfig {
        threads,
        iterations: u64::MAX,
        operand1: OperandSpec::fixed(lhs),
        operand2: OperandSpec::fixed(rhs),
        ..RunConfig::default()
    }
}

#[test]
fn one_faulty_worker_produces_one_record_and_stops_everyone() {
    let faulty = WorkerId::new(2);
    let coordinator = Coordinator::new(endless(8, 0xDEAD_BEEF, 0x1234_5678)).unwrap();
    let outcome = coordinator
        .run(
            |id| XorShiftRng::for_worker(9, id),
            |id| {
                if id == faulty {
                    InjectingMultiplier::corrupt_call(20_000, MASK)
                } else {
                    InjectingMultiplier::healthy()
                }
            },
            &StaticProbe,
        )
        .unwrap();

    assert_eq!(outcome.exit_status(), ExitStatus::FaultDetected);
    assert_eq!(outcome.suppressed_divergences, 0);
    let record = outcome.record.unwrap();
    let expected = 0xDEAD_BEEF_u64.wrapping_mul(0x1234_5678);
    assert_eq!(record.worker_id, faulty);
    assert_eq!(record.reference_result, expected);
    assert_eq!(record.observed_result_a, expected);
    assert_eq!(record.observed_result_b, expected ^ MASK);
    assert_eq!(record.xor_divergence, MASK);
    assert_eq!(record.iterations_performed, 10_000);
    assert_eq!(record.temperature.as_deref(), Some("+51.0°C"));
    assert_eq!(record.frequency_mhz.as_deref(), Some("2400"));
    assert_eq!(record.mismatching_results().collect::<Vec<_>>(), vec![expected ^ MASK]);

    // Healthy workers never diverged and saw the flag on their own.
    for task in &outcome.tasks {
        if task.worker_id != faulty {
            assert!(!task.diverged());
        }
    }
    assert!(coordinator.signal().fault_detected());
    assert!(coordinator.signal().stop_requested());
}

#[test]
fn racing_divergences_still_yield_a_single_record() {
    let threads = 16;
    let coordinator = Coordinator::new(endless(threads, 3, 7)).unwrap();
    let outcome = coordinator
        .run(
            |id| XorShiftRng::for_worker(4, id),
            |_| InjectingMultiplier::corrupt_call(2, 1),
            &DeadProbe,
        )
        .unwrap();

    let record = outcome.record.as_ref().unwrap();
    assert_eq!(record.reference_result, 21);
    assert_eq!(record.temperature, None);
    assert_eq!(record.frequency_mhz, None);

    // Every worker that got to iterate diverged on its first iteration; one
    // reported and the rest were counted as suppressed.
    let diverged = outcome.tasks.iter().filter(|t| t.diverged()).count() as u64;
    assert!(diverged >= 1);
    assert_eq!(diverged, 1 + outcome.suppressed_divergences);
    assert!(outcome.suppressed_divergences < threads as u64);
}

#[test]
fn published_record_matches_outcome() {
    let coordinator = Coordinator::new(endless(2, 11, 13)).unwrap();
    let outcome = coordinator
        .run(
            |id| XorShiftRng::for_worker(0, id),
            |id| {
                if id.index() == 1 {
                    InjectingMultiplier::corrupt_call(4, 0x80)
                } else {
                    InjectingMultiplier::healthy()
                }
            },
            &StaticProbe,
        )
        .unwrap();

    assert_eq!(coordinator.signal().wait_record(), outcome.record.as_ref());
    assert_eq!(outcome.record.unwrap().iterations_performed, 2);
}

#[test]
fn peers_stop_within_one_iteration_of_the_fault_flag() {
    let threads = 8;
    let faulty = WorkerId::new(5);
    let late: Vec<AtomicU64> = (0..threads).map(|_| AtomicU64::new(0)).collect();
    let coordinator = Coordinator::new(endless(threads, 0xABCD, 0x1234)).unwrap();
    let signal = coordinator.signal();
    let outcome = coordinator
        .run(
            |id| XorShiftRng::for_worker(5, id),
            |id| LateCallCounter {
                inner: if id == faulty {
                    InjectingMultiplier::corrupt_call(50_000, MASK)
                } else {
                    InjectingMultiplier::healthy()
                },
                signal,
                late_calls: &late[id.index()],
            },
            &DeadProbe,
        )
        .unwrap();

    assert_eq!(outcome.record.unwrap().worker_id, faulty);
    for (index, calls) in late.iter().enumerate() {
        if index == faulty.index() {
            continue;
        }
        // At most the two multiplies of the iteration in flight.
        let calls = calls.load(Ordering::Relaxed);
        assert!(calls <= 2, "worker {index} made {calls} multiplies after the flag");
    }
}
