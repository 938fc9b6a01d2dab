//! This module contains common testing utilities for the end-to-end tests
//! of the engine.

use anyhow::anyhow;
use decaf::{
    engine::{self, tracker::CountingTracker, Config},
    ir::parser::parse_module,
    watchdog::NoWatchdog,
};

/// Runs `function` of the module in `source` with a counting tracker,
/// returning how many failures the engine reported.
pub fn failures_in(source: &str, function: &str) -> anyhow::Result<usize> {
    let module = parse_module(source)?;
    let target = module
        .function_named(function)
        .ok_or_else(|| anyhow!("no function `{function}` in the test module"))?;

    let mut tracker = CountingTracker::new();
    engine::run(&module, target, &Config::default(), &mut tracker, NoWatchdog.shared())?;

    Ok(tracker.failures())
}
