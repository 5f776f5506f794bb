// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Process-wide fault signal shared by every worker.
//!
//! # Ordering
//!
//! Both flags are monotonic (false → true, never reset). Loads use
//! `Acquire`, stores use `Release`, and the report claim is one
//! `compare_exchange(false, true, AcqRel, Acquire)` on `fault_detected`, so
//! exactly one worker ever wins it. The record itself lives in a
//! [`OnceLock`], which carries its own happens-before edge from the winner's
//! publish to any reader.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;

use crate::report::DiagnosticRecord;

/// Shared detection/stop state for a run.
#[derive(Debug, Default)]
pub struct FaultSignal {
    fault_detected: AtomicBool,
    stop_requested: AtomicBool,
    suppressed: AtomicU64,
    record: OnceLock<DiagnosticRecord>,
}

impl FaultSignal {
    /// Both flags clear, no record.
    pub fn new() -> Self {
        Self::default()
    }

    /// A divergence has been claimed.
    pub fn fault_detected(&self) -> bool {
        self.fault_detected.load(Ordering::Acquire)
    }

    /// Someone asked the workers to stop.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Workers keep going while this holds.
    pub fn should_run(&self) -> bool {
        !self.fault_detected() && !self.stop_requested()
    }

    /// Asks every worker to finish its current iteration and exit.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Attempts to become the run's single reporter.
    ///
    /// Returns `Some` for exactly one caller per run. The winner's peers are
    /// told to stop immediately; the claim is then used to publish the record.
    pub fn try_claim_report(&self) -> Option<ReportClaim<'_>> {
        self.fault_detected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.request_stop();
        Some(ReportClaim { signal: self })
    }

    /// Counts a divergence that lost the reporting race. Returns the new total.
    pub fn note_suppressed(&self) -> u64 {
        self.suppressed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Divergences observed after the report was already claimed.
    pub fn suppressed_divergences(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    /// The published record, if the winner has finished building it.
    pub fn record(&self) -> Option<&DiagnosticRecord> {
        self.record.get()
    }

    /// Blocks until the winner publishes when a fault has been claimed.
    /// Returns `None` immediately when no fault has been detected.
    pub fn wait_record(&self) -> Option<&DiagnosticRecord> {
        if self.fault_detected() {
            Some(self.record.wait())
        } else {
            None
        }
    }
}

/// Proof of having won the reporting race. Only its holder can publish.
#[must_use = "a claimed report must be published"]
#[derive(Debug)]
pub struct ReportClaim<'a> {
    signal: &'a FaultSignal,
}

impl<'a> ReportClaim<'a> {
    /// Stores the run's single record.
    pub fn publish(self, record: DiagnosticRecord) -> &'a DiagnosticRecord {
        self.signal.record.get_or_init(|| record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn fresh_signal_runs() {
        let signal = FaultSignal::new();
        assert!(signal.should_run());
        assert!(signal.record().is_none());
        assert!(signal.wait_record().is_none());
    }

    #[test]
    fn stop_is_sticky() {
        let signal = FaultSignal::new();
        signal.request_stop();
        signal.request_stop();
        assert!(signal.stop_requested());
        assert!(!signal.fault_detected());
        assert!(!signal.should_run());
    }

    #[test]
    fn claim_has_one_winner_under_contention() {
        let signal = FaultSignal::new();
        let winners = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| {
                    if signal.try_claim_report().is_some() {
                        winners.fetch_add(1, Ordering::Relaxed);
                    } else {
                        signal.note_suppressed();
                    }
                });
            }
        });
        assert_eq!(winners.load(Ordering::Relaxed), 1);
        assert_eq!(signal.suppressed_divergences(), 15);
        assert!(signal.fault_detected());
        assert!(signal.stop_requested());
    }

    #[test]
    fn published_record_is_visible() {
        let signal = FaultSignal::new();
        let claim = signal.try_claim_report().unwrap();
        let record = DiagnosticRecord {
            worker_id: crate::task::WorkerId::new(0),
            operand1: 2,
            operand2: 3,
            reference_result: 6,
            observed_result_a: 6,
            observed_result_b: 7,
            xor_divergence: 1,
            iterations_performed: 1,
            temperature: None,
            frequency_mhz: None,
        };
        claim.publish(record.clone());
        assert_eq!(signal.record(), Some(&record));
        assert_eq!(signal.wait_record(), Some(&record));
        assert!(signal.try_claim_report().is_none());
    }
}
