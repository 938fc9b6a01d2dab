//! This library implements a symbolic execution engine for a small typed,
//! SSA-form, basic-block-structured intermediate representation. Given a
//! function, it explores every feasible control-flow path from the entry
//! block, binding each parameter to a fresh symbolic bit-vector and
//! accumulating a path condition in the Z3 solver as it goes. Whenever a
//! reachable operation can fail — an assertion that may be false, a
//! division by zero, a signed-division overflow — the engine reports a
//! concrete model witnessing the failure.
//!
//! # How it Works
//!
//! From a very high level, a run proceeds as follows:
//!
//! 1. IR source text is parsed into an [`ir::Module`] by
//!    [`ir::parser::parse_module`].
//! 2. An initial [`engine::context::Context`] is built for the target
//!    function, with every parameter bound to a fresh symbolic bit-vector
//!    of the parameter's width.
//! 3. The [`engine::interpreter::Interpreter`] advances one context at a
//!    time, one instruction at a time. Conditional branches whose two
//!    successors are both feasible fork the context; the fork is pushed
//!    onto the [`engine::executor::Executor`] worklist and picked up later
//!    in LIFO order.
//! 4. Failing operations that are reachable under the current path
//!    condition are reported to a
//!    [`engine::tracker::FailureTracker`] together with the solver's
//!    model, and the path continues with the complementary constraint
//!    added.
//!
//! Programs communicate with the engine through two runtime entry points
//! that must be declared (not defined) in the input: `decaf_assume(i1)`
//! constrains the current path, and `decaf_assert(i1)` checks a property
//! and reports a counterexample when it can be violated.
//!
//! # Basic Usage
//!
//! ```
//! use decaf::{
//!     engine::{self, tracker::CountingTracker, Config},
//!     ir::parser::parse_module,
//!     watchdog::NoWatchdog,
//! };
//!
//! let module = parse_module(
//!     r"
//!     declare @decaf_assert(i1)
//!
//!     define @test(%x: i32) {
//!     entry:
//!       %c = icmp.eq %x, 0:i32
//!       call @decaf_assert(%c)
//!       ret
//!     }
//!     ",
//! )
//! .unwrap();
//!
//! let target = module.function_named("test").unwrap();
//! let mut tracker = CountingTracker::new();
//! engine::run(&module, target, &Config::default(), &mut tracker, NoWatchdog.shared()).unwrap();
//!
//! // The assertion is refutable: any nonzero `x` violates it.
//! assert_eq!(tracker.failures(), 1);
//! ```
//!
//! # Scope
//!
//! The engine has no memory model: loads, stores, pointers, and aggregates
//! are not part of the IR. There is no floating point, no indirect calls,
//! and no external functions beyond the two runtime entry points. Malformed
//! input that gets past the parser (an unbound SSA value, a block without a
//! terminator reached at run time) aborts the process rather than
//! returning an error; these conditions indicate bugs, not user input
//! problems.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod constant;
pub mod engine;
pub mod error;
pub mod ir;
pub mod smt;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use engine::{run, Config};
pub use ir::parser::parse_module;
