// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Clean-run behaviour of the worker coordinator.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use sdc_core::{
    ConfigError, Coordinator, ExitStatus, NativeMultiplier, OperandSpec, RngPolicy, RunConfig,
    XorShiftRng, MAX_THREADS,
};

mod common;
use common::{DeadProbe, SoftwareMultiplier};

#[test]
fn four_fixed_workers_complete_clean() {
    let config = RunConfig {
        threads: 4,
        iterations: 100_000,
        operand1: OperandSpec::fixed(0x10),
        operand2: OperandSpec::fixed(0x20),
        max_cycles: Some(1),
        ..RunConfig::default()
    };
    let coordinator = Coordinator::new(config).unwrap();
    let outcome = coordinator
        .run(|id| XorShiftRng::for_worker(0, id), |_| NativeMultiplier, &DeadProbe)
        .unwrap();

    assert_eq!(outcome.exit_status(), ExitStatus::Clean);
    assert_eq!(outcome.exit_status().code(), 0);
    assert!(outcome.record.is_none());
    assert_eq!(outcome.tasks.len(), 4);
    for (index, task) in outcome.tasks.iter().enumerate() {
        assert_eq!(task.worker_id.index(), index);
        assert_eq!(task.result_a, 0x200);
        assert_eq!(task.result_b, 0x200);
        assert_eq!(task.iterations_performed, 100_000);
        assert_eq!(task.cycles_completed, 1);
    }
}

#[test]
fn software_multiply_never_diverges_over_many_operands() {
    let config = RunConfig {
        threads: 4,
        iterations: 500,
        operand1: OperandSpec::randomized(u64::MAX, 0),
        operand2: OperandSpec::randomized(u64::MAX, 0x1_0000),
        max_cycles: Some(400),
        ..RunConfig::default()
    };
    let factory = RngPolicy::Software { seed: 0x5EED }.resolve().unwrap();
    let coordinator = Coordinator::new(config).unwrap();
    let outcome = coordinator
        .run(|id| factory.for_worker(id), |_| SoftwareMultiplier, &DeadProbe)
        .unwrap();

    assert!(!outcome.is_fault());
    assert_eq!(outcome.suppressed_divergences, 0);
    for task in &outcome.tasks {
        assert_eq!(task.cycles_completed, 400);
        assert_eq!(task.result_a, task.result_b);
        assert_eq!(task.result_a, task.operand1.wrapping_mul(task.operand2));
    }
}

#[test]
fn duration_bound_stops_an_unbounded_run() {
    let config = RunConfig {
        threads: 2,
        iterations: 10_000,
        operand1: OperandSpec::fixed(7),
        operand2: OperandSpec::fixed(9),
        duration: Some(Duration::from_millis(50)),
        ..RunConfig::default()
    };
    let coordinator = Coordinator::new(config).unwrap();
    let outcome = coordinator
        .run(|id| XorShiftRng::for_worker(1, id), |_| NativeMultiplier, &DeadProbe)
        .unwrap();

    assert!(coordinator.signal().stop_requested());
    assert!(!coordinator.signal().fault_detected());
    assert_eq!(outcome.exit_status(), ExitStatus::Clean);
    assert!(outcome.elapsed >= Duration::from_millis(50));
    for task in &outcome.tasks {
        assert_eq!(task.result_a, 63);
        assert_eq!(task.result_b, 63);
    }
}

#[test]
fn external_stop_ends_the_run() {
    let config = RunConfig {
        threads: 3,
        iterations: u64::MAX,
        operand1: OperandSpec::fixed(3),
        operand2: OperandSpec::fixed(5),
        ..RunConfig::default()
    };
    let coordinator = Coordinator::new(config).unwrap();
    let outcome = std::thread::scope(|s| {
        let runner = s.spawn(|| {
            coordinator.run(
                |id| XorShiftRng::for_worker(2, id),
                |_| SoftwareMultiplier,
                &DeadProbe,
            )
        });
        std::thread::sleep(Duration::from_millis(20));
        coordinator.signal().request_stop();
        runner.join().unwrap()
    })
    .unwrap();

    assert!(!outcome.is_fault());
    assert!(outcome.tasks.iter().all(|t| t.result_a == 15 && t.result_b == 15));
}

#[test]
fn second_run_after_stop_does_not_iterate() {
    let config = RunConfig {
        threads: 2,
        operand1: OperandSpec::fixed(3),
        operand2: OperandSpec::fixed(5),
        max_cycles: Some(1),
        ..RunConfig::default()
    };
    let coordinator = Coordinator::new(config).unwrap();
    coordinator.signal().request_stop();
    let outcome = coordinator
        .run(|id| XorShiftRng::for_worker(0, id), |_| SoftwareMultiplier, &DeadProbe)
        .unwrap();
    assert!(outcome.tasks.iter().all(|t| t.iterations_performed == 0));
}

#[test]
fn invalid_config_is_rejected_before_spawning() {
    let config = RunConfig {
        operand1: OperandSpec::randomized(5, 9),
        ..RunConfig::default()
    };
    assert!(matches!(
        Coordinator::new(config),
        Err(ConfigError::EmptyRange { .. })
    ));
}

#[test]
fn unschedulable_duration_is_rejected_before_spawning() {
    let config = RunConfig {
        operand1: OperandSpec::fixed(3),
        operand2: OperandSpec::fixed(5),
        max_cycles: Some(1),
        duration: Some(Duration::from_secs(u64::MAX)),
        ..RunConfig::default()
    };
    assert!(matches!(
        Coordinator::new(config),
        Err(ConfigError::DurationTooLong(_))
    ));
}

#[test]
fn absurd_thread_count_is_rejected_before_spawning() {
    let config = RunConfig {
        threads: usize::MAX,
        ..RunConfig::default()
    };
    assert!(matches!(
        Coordinator::new(config),
        Err(ConfigError::TooManyThreads { max: MAX_THREADS, .. })
    ));
}
