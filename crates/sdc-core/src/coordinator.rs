// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Worker coordinator.
//!
//! Spawns one scoped thread per [`WorkerTask`], lets each run the
//! generate → redundant-multiply loop until the [`FaultSignal`] trips (or the
//! configured cycle/duration bound is reached), and joins them all.
//!
//! # Worker Loop
//!
//! ```text
//! while signal.should_run() && cycles < max_cycles:
//!     regenerate operands
//!     match run_cycle():
//!         Exhausted => cycles += 1
//!         Stopped   => exit
//!         Diverged  => claim report (CAS) → build + publish, or count as suppressed; exit
//! ```

use std::panic::resume_unwind;
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use crate::config::RunConfig;
use crate::error::{ConfigError, SdcError};
use crate::kernel::{run_cycle, CycleOutcome, Multiplier};
use crate::probe::EnvironmentProbe;
use crate::report::DiagnosticRecord;
use crate::rng::RandomSource;
use crate::signal::FaultSignal;
use crate::task::{WorkerId, WorkerTask};

/// How often the coordinator checks the wall-clock bound.
const DEADLINE_POLL: Duration = Duration::from_millis(10);

/// Process exit status for the surrounding CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// No divergence; the run was stopped or exhausted.
    Clean = 0,
    /// A divergence was detected and reported.
    FaultDetected = 1,
    /// Bad flags or configuration; nothing ran.
    UsageError = 2,
}

impl ExitStatus {
    /// Numeric process exit code.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final state of every worker, in worker order.
    pub tasks: Vec<WorkerTask>,
    /// The single record, when a fault was detected.
    pub record: Option<DiagnosticRecord>,
    /// Divergences that lost the reporting race.
    pub suppressed_divergences: u64,
    /// Wall-clock time from first spawn to last join.
    pub elapsed: Duration,
}

impl RunOutcome {
    /// True when a divergence was detected.
    pub fn is_fault(&self) -> bool {
        self.record.is_some()
    }

    /// Exit status for the process boundary.
    pub fn exit_status(&self) -> ExitStatus {
        if self.is_fault() {
            ExitStatus::FaultDetected
        } else {
            ExitStatus::Clean
        }
    }
}

/// Owns the run configuration and the shared fault signal.
///
/// A coordinator runs once: the signal is never reset, so a second
/// [`run`](Self::run) after a stop or fault returns without iterating.
#[derive(Debug)]
pub struct Coordinator {
    config: RunConfig,
    signal: FaultSignal,
}

impl Coordinator {
    /// Validates `config`. No thread is created until [`run`](Self::run).
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            signal: FaultSignal::new(),
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The shared signal. Calling [`FaultSignal::request_stop`] from another
    /// thread ends the run.
    pub fn signal(&self) -> &FaultSignal {
        &self.signal
    }

    /// Runs every worker to completion.
    ///
    /// `make_rng` and `make_multiplier` are called once per worker, on that
    /// worker's thread. `probe` is consulted only by the reporting worker.
    ///
    /// # Errors
    ///
    /// Returns [`SdcError::Spawn`] if a worker thread cannot be created; any
    /// workers already running are stopped and joined first.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from any worker thread.
    #[instrument(
        skip_all,
        fields(threads = self.config.threads, iterations = self.config.iterations)
    )]
    pub fn run<R, M, FR, FM, P>(
        &self,
        make_rng: FR,
        make_multiplier: FM,
        probe: &P,
    ) -> Result<RunOutcome, SdcError>
    where
        R: RandomSource,
        M: Multiplier,
        FR: Fn(WorkerId) -> R + Sync,
        FM: Fn(WorkerId) -> M + Sync,
        P: EnvironmentProbe + ?Sized,
    {
        let started = Instant::now();
        let config = &self.config;
        let signal = &self.signal;

        let tasks = thread::scope(|s| -> Result<Vec<WorkerTask>, SdcError> {
            let mut handles: Vec<ScopedJoinHandle<'_, WorkerTask>> =
                Vec::with_capacity(config.threads);
            let mut spawn_error = None;

            for index in 0..config.threads {
                let id = WorkerId::new(index);
                let task = WorkerTask::from_config(id, config);
                let make_rng = &make_rng;
                let make_multiplier = &make_multiplier;

                let spawned = thread::Builder::new()
                    .name(format!("sdc-worker-{index}"))
                    .spawn_scoped(s, move || {
                        let mut rng = make_rng(id);
                        let mut multiplier = make_multiplier(id);
                        run_worker(
                            task,
                            &mut rng,
                            &mut multiplier,
                            signal,
                            probe,
                            config.max_cycles,
                        )
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        error!(worker = index, %err, "failed to spawn worker; stopping run");
                        signal.request_stop();
                        spawn_error = Some(err);
                        break;
                    }
                }
            }

            if spawn_error.is_none() {
                if let Some(deadline) = config.duration.and_then(|d| started.checked_add(d)) {
                    self.watch_deadline(deadline, &handles);
                }
            }

            let tasks: Vec<WorkerTask> = handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(task) => task,
                    Err(e) => resume_unwind(e),
                })
                .collect();

            match spawn_error {
                Some(err) => Err(SdcError::Spawn(err)),
                None => Ok(tasks),
            }
        })?;

        let outcome = RunOutcome {
            tasks,
            record: self.signal.record().cloned(),
            suppressed_divergences: self.signal.suppressed_divergences(),
            elapsed: started.elapsed(),
        };
        info!(
            fault = outcome.is_fault(),
            suppressed = outcome.suppressed_divergences,
            elapsed_ms = outcome.elapsed.as_millis(),
            "run finished"
        );
        Ok(outcome)
    }

    fn watch_deadline(&self, deadline: Instant, handles: &[ScopedJoinHandle<'_, WorkerTask>]) {
        while !handles.iter().all(ScopedJoinHandle::is_finished) {
            let now = Instant::now();
            if now >= deadline {
                info!("run duration elapsed; requesting stop");
                self.signal.request_stop();
                return;
            }
            thread::sleep((deadline - now).min(DEADLINE_POLL));
        }
    }
}

fn run_worker<R, M, P>(
    mut task: WorkerTask,
    rng: &mut R,
    multiplier: &mut M,
    signal: &FaultSignal,
    probe: &P,
    max_cycles: Option<u64>,
) -> WorkerTask
where
    R: RandomSource + ?Sized,
    M: Multiplier + ?Sized,
    P: EnvironmentProbe + ?Sized,
{
    debug!(worker = %task.worker_id, "worker started");
    while signal.should_run() {
        if max_cycles.is_some_and(|cap| task.cycles_completed >= cap) {
            break;
        }
        task.regenerate(rng);
        match run_cycle(&mut task, multiplier, signal) {
            CycleOutcome::Exhausted => task.cycles_completed += 1,
            CycleOutcome::Stopped => break,
            CycleOutcome::Diverged => {
                report_divergence(&task, multiplier, signal, probe);
                break;
            }
        }
    }
    debug!(
        worker = %task.worker_id,
        cycles = task.cycles_completed,
        "worker stopped"
    );
    task
}

fn report_divergence<M, P>(task: &WorkerTask, multiplier: &mut M, signal: &FaultSignal, probe: &P)
where
    M: Multiplier + ?Sized,
    P: EnvironmentProbe + ?Sized,
{
    if let Some(claim) = signal.try_claim_report() {
        error!(
            worker = %task.worker_id,
            operand1 = format_args!("{:#x}", task.operand1),
            operand2 = format_args!("{:#x}", task.operand2),
            xor = format_args!("{:#x}", task.result_a ^ task.result_b),
            "redundant multiply diverged"
        );
        claim.publish(DiagnosticRecord::build(task, multiplier, probe));
    } else {
        let total = signal.note_suppressed();
        warn!(
            worker = %task.worker_id,
            total,
            "divergence after the report was claimed; discarded"
        );
    }
}
