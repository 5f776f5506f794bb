// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Verbose-mode tables: run settings before, worker state after.

use std::io::{self, Write};

use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use sdc_core::{OperandMode, OperandSpec, RunConfig, RunOutcome};

fn describe(mode: OperandMode) -> &'static str {
    match mode {
        OperandMode::Fixed => "fixed value",
        OperandMode::Randomized => "maximum",
    }
}

fn hex(v: u64) -> String {
    format!("{v:#018x}")
}

fn operand_rows(table: &mut Table, label: &str, spec: &OperandSpec) {
    table.add_row(vec![label.to_owned(), hex(spec.value)]);
    table.add_row(vec![format!("{label} is"), describe(spec.mode).to_owned()]);
    table.add_row(vec![format!("{label} min is"), hex(spec.min)]);
}

/// Settings table printed before the workers start.
pub fn write_config<W: Write>(out: &mut W, cfg: &RunConfig, rng: &str) -> io::Result<()> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Summary", ""]);
    table.add_row(vec!["Iterations".to_owned(), cfg.iterations.to_string()]);
    table.add_row(vec!["Threads".to_owned(), cfg.threads.to_string()]);
    operand_rows(&mut table, "Operand1", &cfg.operand1);
    operand_rows(&mut table, "Operand2", &cfg.operand2);
    table.add_row(vec![
        "Cycles per worker".to_owned(),
        cfg.max_cycles
            .map_or_else(|| "until fault".to_owned(), |c| c.to_string()),
    ]);
    table.add_row(vec![
        "Duration".to_owned(),
        cfg.duration
            .map_or_else(|| "until fault".to_owned(), |d| format!("{}s", d.as_secs())),
    ]);
    table.add_row(vec!["Random source".to_owned(), rng.to_owned()]);
    writeln!(out, "{table}")
}

/// Final per-worker state, for post-hoc inspection.
pub fn write_outcome<W: Write>(out: &mut W, outcome: &RunOutcome) -> io::Result<()> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Worker",
        "Cycles",
        "Iterations",
        "Operand 1",
        "Operand 2",
        "Result A",
        "Result B",
    ]);
    for task in &outcome.tasks {
        table.add_row(vec![
            task.worker_id.to_string(),
            task.cycles_completed.to_string(),
            task.iterations_performed.to_string(),
            hex(task.operand1),
            hex(task.operand2),
            hex(task.result_a),
            hex(task.result_b),
        ]);
    }
    writeln!(out, "{table}")?;
    if outcome.suppressed_divergences > 0 {
        writeln!(
            out,
            "{} further divergence(s) observed after the report was claimed",
            outcome.suppressed_divergences
        )?;
    }
    writeln!(out, "Elapsed: {:.3}s", outcome.elapsed.as_secs_f64())
}
