//! The command-line driver for the engine: loads an IR file, resolves the
//! target function, and symbolically executes it, printing every failure
//! found together with the path condition that led to it.

use std::{
    fs,
    path::PathBuf,
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Context as _};
use clap::Parser;
use decaf::{
    engine::{self, tracker::CountingTracker, Config},
    error::execution,
    ir::parser::parse_module,
    watchdog::{DynWatchdog, InterruptWatchdog},
};

#[derive(Debug, Parser)]
#[command(
    name = "decaf",
    about = "Symbolically executes a function of an IR module, reporting \
             counterexamples for every reachable failure",
    version
)]
struct Cli {
    /// The IR file to load.
    input: PathBuf,

    /// The name of the function to execute symbolically.
    function: String,

    /// Succeed when at least one failure is found, instead of when none
    /// are. Intended for tests whose expected outcome is a counterexample.
    #[arg(long)]
    expect_failure: bool,

    /// Stop forking once this many execution contexts have been spawned.
    #[arg(long)]
    max_forks: Option<usize>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    install_abort_hook();

    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new()
        .filter_module("decaf", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();

    match execute(&cli, interrupt_watchdog()) {
        Ok(failures) => {
            let succeeded = if cli.expect_failure { failures > 0 } else { failures == 0 };
            if !succeeded {
                process::exit(1);
            }
        }
        Err(error) => {
            if let Some(execution::Error::Interrupted) =
                error.downcast_ref::<execution::Error>()
            {
                eprintln!("Cancelled.");
                process::exit(130);
            }
            eprintln!("decaf: {error:#}");
            process::exit(1);
        }
    }
}

/// Loads and runs the requested function, returning how many failures were
/// reported.
fn execute(cli: &Cli, watchdog: DynWatchdog) -> anyhow::Result<usize> {
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("loading file `{}`", cli.input.display()))?;
    let module = parse_module(&source)
        .with_context(|| format!("parsing `{}`", cli.input.display()))?;

    let target = module
        .function_named(&cli.function)
        .ok_or_else(|| anyhow!("no function `{}` in `{}`", cli.function, cli.input.display()))?;

    let mut config = Config::default();
    if let Some(limit) = cli.max_forks {
        config = config.with_max_forks(limit);
    }

    let mut tracker = CountingTracker::new().with_diagnostics(true);
    engine::run(&module, target, &config, &mut tracker, watchdog)?;

    Ok(tracker.failures())
}

/// Builds a watchdog that stops the exploration when Ctrl+C is pressed.
fn interrupt_watchdog() -> DynWatchdog {
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .expect("failed to set Ctrl+C handler");
    }
    InterruptWatchdog::new(stop).shared()
}

/// Replaces the default panic handler with one that prints the panic
/// message and a backtrace, then exits with the conventional abort status.
///
/// Engine-internal invariant violations (an unbound SSA value, a cursor off
/// the end of a block, an unimplemented external) abort the process this
/// way; they indicate limitations or bugs rather than user errors.
fn install_abort_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        eprintln!("{info}");
        eprintln!("{backtrace}");
        process::exit(255);
    }));
}
