//! This module contains errors pertaining to the symbolic execution of the
//! IR by the engine.
//!
//! Note that this enum covers only the conditions that a caller can
//! meaningfully react to. Conditions that indicate malformed input or a bug
//! in the engine itself (an unknown variable, a cursor running off the end of
//! a block, an empty context stack) are treated as programmer errors and
//! abort the process instead; see the crate documentation.

use thiserror::Error;

/// Errors that occur during the execution of a function by the
/// [`crate::engine`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The function `@{name}` is a declaration and has no body to execute")]
    TargetIsDeclaration { name: String },

    #[error("The exploration was interrupted by the watchdog")]
    Interrupted,
}

/// The result type for methods that may have execution errors.
pub type Result<T> = std::result::Result<T, Error>;
