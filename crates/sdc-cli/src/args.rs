// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Flag parsing.
//!
//! The short flags follow the historical getopt interface, including its
//! leniency: unknown flags (alone, inside a short-flag cluster, or as
//! `--name=value`) and flags missing their value are reported on stdout and
//! dropped, and the run continues. A repeated flag keeps its last value. Help
//! and malformed values end the process with a usage error.

use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{ArgAction, Parser, ValueEnum};
use sdc_core::{OperandMode, OperandSpec, RngPolicy, RunConfig};

/// Which random source operand generation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RngChoice {
    /// RDRAND; abort when missing.
    Hw,
    /// Seeded xorshift64*.
    Sw,
    /// RDRAND, falling back to xorshift64*.
    Auto,
}

/// Command-line flags. Every run setting is optional so a profile can supply it.
#[derive(Parser, Debug)]
#[command(
    name = "sdc-hunt",
    version,
    about = "Hunt for silent data corruption with redundant 64-bit multiplies",
    disable_help_flag = true,
    args_override_self = true
)]
pub struct Args {
    /// Iterations per operand-regeneration cycle [default: 1000]
    #[arg(short = 'i', value_name = "N")]
    pub iterations: Option<u64>,

    /// Operand 1: fixed value or randomization maximum [default: 0x100000000]
    #[arg(short = '1', value_name = "0xHEX", value_parser = parse_hex)]
    pub operand1: Option<u64>,

    /// Operand 2: fixed value or randomization maximum [default: 0x100000000]
    #[arg(short = '2', value_name = "0xHEX", value_parser = parse_hex)]
    pub operand2: Option<u64>,

    /// Number of worker threads [default: 1]
    #[arg(short = 't', value_name = "N")]
    pub threads: Option<usize>,

    /// Operand 1 mode [default: max]
    #[arg(short = 'z', value_name = "fixed|max", value_parser = parse_mode)]
    pub operand1_mode: Option<OperandMode>,

    /// Operand 2 mode [default: max]
    #[arg(short = 'x', value_name = "fixed|max", value_parser = parse_mode)]
    pub operand2_mode: Option<OperandMode>,

    /// Operand 1 minimum when randomized [default: 0]
    #[arg(short = 'q', value_name = "0xHEX", value_parser = parse_hex)]
    pub operand1_min: Option<u64>,

    /// Operand 2 minimum when randomized [default: 0]
    #[arg(short = 'w', value_name = "0xHEX", value_parser = parse_hex)]
    pub operand2_min: Option<u64>,

    /// Silent mode: no summary, warnings-only logging
    #[arg(short = 'S')]
    pub silent: bool,

    /// Stop after N clean cycles per worker (default: run until a fault)
    #[arg(long, value_name = "N")]
    pub cycles: Option<u64>,

    /// Stop after SECS seconds (default: run until a fault)
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Random source for randomized operands
    #[arg(long, value_enum, default_value_t = RngChoice::Hw)]
    pub rng: RngChoice,

    /// Seed for the software generator (default: derived from the clock)
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Emit the diagnostic record as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not sample temperature or clock frequency
    #[arg(long)]
    pub no_probe: bool,

    /// Wait for Enter before exiting
    #[arg(long)]
    pub pause: bool,

    /// Load a saved profile before applying flags
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Save the effective configuration as a profile
    #[arg(long, value_name = "NAME")]
    pub save_profile: Option<String>,

    /// List saved profiles and exit
    #[arg(long)]
    pub list_profiles: bool,

    /// Print help
    #[arg(short = 'h', long = "help", action = ArgAction::Help)]
    help: Option<bool>,
}

impl Args {
    /// Layers the flags that were given on top of `base`.
    pub fn apply(&self, base: RunConfig) -> RunConfig {
        RunConfig {
            iterations: self.iterations.unwrap_or(base.iterations),
            threads: self.threads.unwrap_or(base.threads),
            operand1: overlay(
                base.operand1,
                self.operand1_mode,
                self.operand1,
                self.operand1_min,
            ),
            operand2: overlay(
                base.operand2,
                self.operand2_mode,
                self.operand2,
                self.operand2_min,
            ),
            max_cycles: self.cycles.or(base.max_cycles),
            duration: self.duration.map(Duration::from_secs).or(base.duration),
        }
    }

    /// Policy for the random source, seeded from `--seed` or the clock.
    pub fn rng_policy(&self) -> RngPolicy {
        let seed = self.seed.unwrap_or_else(clock_seed);
        match self.rng {
            RngChoice::Hw => RngPolicy::Hardware,
            RngChoice::Sw => RngPolicy::Software { seed },
            RngChoice::Auto => RngPolicy::HardwareOrSoftware { seed },
        }
    }
}

fn overlay(
    base: OperandSpec,
    mode: Option<OperandMode>,
    value: Option<u64>,
    min: Option<u64>,
) -> OperandSpec {
    OperandSpec {
        mode: mode.unwrap_or(base.mode),
        value: value.unwrap_or(base.value),
        min: min.unwrap_or(base.min),
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0x5dc, |d| d.as_secs() ^ u64::from(d.subsec_nanos()).rotate_left(32))
}

/// Hex with or without a `0x` prefix.
fn parse_hex(s: &str) -> Result<u64, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|e| format!("{s:?} is not a 64-bit hex value: {e}"))
}

fn parse_mode(s: &str) -> Result<OperandMode, String> {
    s.parse().map_err(|e: sdc_core::ConfigError| e.to_string())
}

/// What the command line asked for.
#[derive(Debug)]
pub enum Parsed {
    /// Run (or list profiles) with these flags.
    Run(Box<Args>),
    /// `-h`/`--help`/`--version`: the rendered text.
    Help(String),
    /// A fatal parse error.
    Invalid(clap::Error),
}

/// Parses `argv`, dropping unknown flags and value-less flags with a note on
/// `out` instead of failing.
pub fn parse_lenient<W: Write>(mut argv: Vec<OsString>, out: &mut W) -> io::Result<Parsed> {
    loop {
        let err = match Args::try_parse_from(&argv) {
            Ok(args) => return Ok(Parsed::Run(Box::new(args))),
            Err(err) => err,
        };
        let recovery = match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                return Ok(Parsed::Help(err.render().to_string()));
            }
            ErrorKind::UnknownArgument => offending_flag(&err).and_then(|flag| {
                drop_unknown(&mut argv, &flag).then(|| format!("unknown option: {flag}"))
            }),
            ErrorKind::InvalidValue if value_missing(&err) => {
                offending_flag(&err).and_then(|flag| {
                    let pos = last_position(&argv, &flag)?;
                    argv.remove(pos);
                    Some(format!("option needs a value: {flag}"))
                })
            }
            _ => None,
        };
        match recovery {
            Some(note) => writeln!(out, "{note}")?,
            None => return Ok(Parsed::Invalid(err)),
        }
    }
}

/// `-i <N>` → `-i`.
fn offending_flag(err: &clap::Error) -> Option<String> {
    match err.get(ContextKind::InvalidArg)? {
        ContextValue::String(arg) => arg.split_whitespace().next().map(str::to_owned),
        _ => None,
    }
}

fn value_missing(err: &clap::Error) -> bool {
    matches!(
        err.get(ContextKind::InvalidValue),
        Some(ContextValue::String(v)) if v.is_empty()
    )
}

/// Removes the first occurrence of an unknown `flag` from `argv`: the whole
/// element (`-k`, `--foo`, `--foo=bar`) or a single letter of a short cluster
/// (`-kS` → `-S`). False when nothing matched.
fn drop_unknown(argv: &mut Vec<OsString>, flag: &str) -> bool {
    let whole = argv.iter().skip(1).position(|a| {
        a.to_str().is_some_and(|a| {
            a == flag || a.strip_prefix(flag).is_some_and(|rest| rest.starts_with('='))
        })
    });
    if let Some(pos) = whole {
        argv.remove(pos + 1);
        return true;
    }

    let mut chars = flag.strip_prefix('-').unwrap_or_default().chars();
    let letter = match (chars.next(), chars.next()) {
        (Some(c), None) if c != '-' => c,
        _ => return false,
    };
    for pos in 1..argv.len() {
        let Some(cluster) = argv[pos].to_str().and_then(|a| a.strip_prefix('-')) else {
            continue;
        };
        if cluster.starts_with('-') || !cluster.contains(letter) {
            continue;
        }
        let rest = cluster.replacen(letter, "", 1);
        if rest.is_empty() {
            argv.remove(pos);
        } else {
            argv[pos] = OsString::from(format!("-{rest}"));
        }
        return true;
    }
    false
}

fn last_position(argv: &[OsString], flag: &str) -> Option<usize> {
    argv.iter()
        .rposition(|a| a.as_os_str() == OsStr::new(flag))
        .filter(|&p| p > 0)
}
