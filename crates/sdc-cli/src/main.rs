// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! sdc-hunt
//!
//! Runs redundant 64-bit multiplies on every requested thread until two
//! products disagree, then prints one diagnostic record and exits 1.
//! Exit 0 means the run ended clean (cycle or duration bound reached);
//! exit 2 means the flags or configuration were rejected.

mod args;
mod sink;
mod summary;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use sdc_config::profile::{ProfileService, RunProfile};
use sdc_config_fs::FsConfigStore;
use sdc_core::{
    Coordinator, EnvironmentProbe, ExitStatus, NativeMultiplier, RngFactory, RunConfig,
};
use sdc_probe::{NullProbe, SysfsProbe};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::args::{parse_lenient, Args, Parsed};
use crate::sink::{JsonSink, ReportSink, TextSink};

fn main() -> ExitCode {
    match run() {
        Ok(status) => ExitCode::from(status.code()),
        Err(err) => {
            let _ = writeln!(io::stderr(), "sdc-hunt: {err:#}");
            ExitCode::from(ExitStatus::UsageError.code())
        }
    }
}

fn run() -> Result<ExitStatus> {
    let mut stdout = io::stdout();
    let args = match parse_lenient(std::env::args_os().collect(), &mut stdout)? {
        Parsed::Run(args) => args,
        Parsed::Help(text) => {
            write!(stdout, "{text}")?;
            return Ok(ExitStatus::UsageError);
        }
        Parsed::Invalid(err) => {
            err.print()?;
            return Ok(ExitStatus::UsageError);
        }
    };

    init_tracing(args.silent)?;

    if args.list_profiles {
        for name in profiles()?.names()? {
            writeln!(stdout, "{name}")?;
        }
        return Ok(ExitStatus::Clean);
    }

    let base = match &args.profile {
        Some(name) => RunConfig::from(
            profiles()?
                .load(name)
                .with_context(|| format!("loading profile {name:?}"))?,
        ),
        None => RunConfig::default(),
    };
    let coordinator = Coordinator::new(args.apply(base)).context("invalid configuration")?;
    let config = coordinator.config();

    if let Some(name) = &args.save_profile {
        profiles()?
            .save(name, &RunProfile::from(config))
            .with_context(|| format!("saving profile {name:?}"))?;
        info!(profile = %name, "profile saved");
    }

    let rng = if config.needs_rng() {
        let policy = args.rng_policy();
        let factory = policy.resolve().context("no usable random source")?;
        if let RngFactory::Software { seed } = factory {
            info!(seed, "using software generator");
        }
        Some(factory)
    } else {
        None
    };

    if !args.silent && !args.json {
        summary::write_config(
            &mut stdout,
            config,
            rng.as_ref().map_or("unused", RngFactory::label),
        )?;
    }

    // Fixed operands never draw, so any factory will do.
    let factory = rng.unwrap_or(RngFactory::Software { seed: 0 });
    let probe: Box<dyn EnvironmentProbe> = if args.no_probe {
        Box::new(NullProbe)
    } else {
        Box::new(SysfsProbe::new())
    };

    let outcome = coordinator.run(
        |id| factory.for_worker(id),
        |_| NativeMultiplier,
        probe.as_ref(),
    )?;

    if let Some(record) = &outcome.record {
        if args.json {
            JsonSink::new(stdout.lock()).emit(record)?;
        } else {
            TextSink::new(stdout.lock()).emit(record)?;
        }
    }
    if !args.json {
        if !args.silent {
            summary::write_outcome(&mut stdout, &outcome)?;
        }
        writeln!(stdout, "Done.")?;
    }

    if args.pause {
        wait_for_enter(&args, &mut stdout)?;
    }
    Ok(outcome.exit_status())
}

fn init_tracing(silent: bool) -> Result<()> {
    let level = if silent { Level::WARN } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber")
}

fn profiles() -> Result<ProfileService<FsConfigStore>> {
    Ok(ProfileService::new(FsConfigStore::new()?))
}

fn wait_for_enter(args: &Args, out: &mut impl Write) -> Result<()> {
    if !args.json {
        writeln!(out, "Press Enter to exit.")?;
        out.flush()?;
    }
    io::stdin().lock().read_line(&mut String::new())?;
    Ok(())
}
