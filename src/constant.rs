//! This module contains constants that are needed throughout the codebase.

/// The widest integer constant that is kept as a native machine word in the
/// IR.
///
/// Literals wider than this are kept as their unsigned decimal rendering and
/// are only materialised as bit-vectors when the solver needs them.
pub const MAX_WORD_CONSTANT_BITS: u32 = 64;

/// The default number of interpreter steps between consultations of the
/// watchdog.
pub const DEFAULT_WATCHDOG_POLL_STEPS: usize = 1000;

/// The name of the runtime entry point that constrains the current path.
pub const ASSUME_INTRINSIC: &str = "decaf_assume";

/// The name of the runtime entry point that checks a property and reports a
/// counterexample when the property can be violated.
pub const ASSERT_INTRINSIC: &str = "decaf_assert";
