// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reporting sinks for the diagnostic record.

use std::io::{self, Write};

use sdc_core::DiagnosticRecord;

/// Destination for the run's single diagnostic record.
pub trait ReportSink {
    /// Writes `record`.
    fn emit(&mut self, record: &DiagnosticRecord) -> io::Result<()>;
}

/// Human-readable block, in the layout downstream log scrapers expect.
pub struct TextSink<W> {
    out: W,
}

impl<W: Write> TextSink<W> {
    /// Sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn emit(&mut self, r: &DiagnosticRecord) -> io::Result<()> {
        let out = &mut self.out;
        writeln!(out)?;
        writeln!(out, "------   CALCULATION ERROR DETECTED   ------")?;
        writeln!(out, " > Worker      \t : {}", r.worker_id)?;
        writeln!(out, " > Iterations  \t : {:08}", r.iterations_performed)?;
        writeln!(out, " > Operand 1   \t : {:016x}", r.operand1)?;
        writeln!(out, " > Operand 2   \t : {:016x}", r.operand2)?;
        writeln!(out, " > Correct     \t : {:016x}", r.reference_result)?;
        for result in r.mismatching_results() {
            writeln!(out, " > Result      \t : {result:016x}")?;
        }
        writeln!(out, " > xor result  \t : {:016x}", r.xor_divergence)?;
        writeln!(
            out,
            " > temperature \t : {}",
            r.temperature.as_deref().unwrap_or("unavailable")
        )?;
        match &r.frequency_mhz {
            Some(mhz) => writeln!(out, " > Frequency   \t : {mhz}MHz")?,
            None => writeln!(out, " > Frequency   \t : unavailable")?,
        }
        out.flush()
    }
}

/// One JSON object per record, newline-terminated.
pub struct JsonSink<W> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    /// Sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn emit(&mut self, record: &DiagnosticRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}
