//! This module contains the [`FailureTracker`] trait and its default
//! implementations: the sink that reported counterexamples flow into.

use z3::Model;

use crate::engine::context::Context;

/// The interface to an object that receives every failure the engine finds.
///
/// A failure is a reachable operation that can misbehave (a refutable
/// assertion, a division by zero, a signed-division overflow) together with
/// a concrete model witnessing it. The engine reports each failure once at
/// its detection site and then continues along the constrained-safe path; it
/// never retries or suppresses a report.
pub trait FailureTracker {
    /// Called once per detected failure with the reporting context and the
    /// model witnessing the failure.
    ///
    /// The context and the model share a solver context, so implementations
    /// can evaluate expressions bound in the context's frames against the
    /// model.
    fn add_failure<'ctx>(&mut self, ctx: &Context<'ctx>, model: &Model<'ctx>);
}

/// A tracker that prints every failure to standard output.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PrintingTracker;

impl FailureTracker for PrintingTracker {
    fn add_failure<'ctx>(&mut self, _ctx: &Context<'ctx>, model: &Model<'ctx>) {
        println!("Found failure:\n{model}");
    }
}

/// A tracker that counts failures, optionally printing each model together
/// with the path condition that led to it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CountingTracker {
    /// The number of failures seen so far.
    failures: usize,

    /// Whether to print each failure's model and path condition.
    diagnostics: bool,
}

impl CountingTracker {
    /// Constructs a new tracker that has seen no failures and prints
    /// nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the tracker prints each failure's model and path
    /// condition to standard output.
    #[must_use]
    pub fn with_diagnostics(mut self, value: bool) -> Self {
        self.diagnostics = value;
        self
    }

    /// Gets the number of failures seen so far.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures
    }
}

impl FailureTracker for CountingTracker {
    fn add_failure<'ctx>(&mut self, ctx: &Context<'ctx>, model: &Model<'ctx>) {
        self.failures += 1;

        if self.diagnostics {
            println!("Found failure:\n{model}");
            for assertion in ctx.path() {
                println!("(assert {assertion})");
            }
        }
    }
}
