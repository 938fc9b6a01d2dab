//! This module contains the symbolic execution engine: the driver that
//! explores every feasible control-flow path of a function, the execution
//! contexts and stack frames making up a path's state, the interpreter that
//! advances one context at a time, and the trackers that reported failures
//! flow into.

pub mod context;
pub mod executor;
pub mod frame;
pub mod interpreter;
pub mod tracker;

use log::debug;

use crate::{
    engine::{context::Context, executor::Executor, interpreter::Interpreter, tracker::FailureTracker},
    error::execution::{Error, Result},
    ir::{FuncId, Module},
    smt,
    watchdog::DynWatchdog,
};

/// The configuration for a run of the engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum number of execution contexts that may be spawned over
    /// the course of a run, counting the initial one.
    ///
    /// Exploration is unchanged below the limit. Once it is reached,
    /// conditional branches with two feasible successors stop forking and
    /// continue down the false successor only, so paths that would only be
    /// reached through further forks go unexplored.
    ///
    /// Defaults to no limit, in which case termination is not guaranteed
    /// for functions with unbounded symbolic loops.
    pub max_forks: Option<usize>,
}

impl Config {
    /// Sets the `max_forks` config parameter to `value`.
    #[must_use]
    pub fn with_max_forks(mut self, value: usize) -> Self {
        self.max_forks = Some(value);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let max_forks = None;
        Self { max_forks }
    }
}

/// Symbolically executes `target` in `module`, reporting every failure
/// found along any feasible path to `tracker`.
///
/// Each parameter of `target` becomes a fresh symbolic bit-vector of the
/// parameter's width. Paths are explored depth-first from a LIFO worklist:
/// the engine runs one context to completion, then picks up the most
/// recently forked one, until no contexts remain.
///
/// # Errors
///
/// Returns [`Err`] if `target` is a declaration, or if the watchdog
/// interrupted the run before the worklist drained.
pub fn run(
    module: &Module,
    target: FuncId,
    config: &Config,
    tracker: &mut dyn FailureTracker,
    watchdog: DynWatchdog,
) -> Result<()> {
    let function = module.function(target);
    if function.is_declaration() {
        return Err(Error::TargetIsDeclaration { name: function.name().to_owned() });
    }

    let z3 = smt::solver_context();
    let mut queue = Executor::new();
    queue.push(Context::new(&z3, module, target));

    while queue.has_next() {
        let mut ctx = queue.pop();
        debug!("exploring a path of `@{}`; {} more queued", function.name(), queue.pending());

        Interpreter::new(
            &mut ctx,
            &mut queue,
            &z3,
            module,
            tracker,
            config,
            watchdog.clone(),
        )
        .execute()?;
    }

    Ok(())
}
