//! This module contains errors pertaining to parsing the textual form of the
//! IR.

use thiserror::Error;

use crate::error::container;

/// Errors that occur while turning IR source text into a
/// [`crate::ir::Module`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Unexpected character {found:?} in IR source")]
    UnexpectedCharacter { found: char },

    #[error("Unexpected token `{found}` where {expected} was expected")]
    UnexpectedToken { found: String, expected: &'static str },

    #[error("The IR source ended in the middle of a {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("`{mnemonic}` is not a known instruction")]
    UnknownInstruction { mnemonic: String },

    #[error("`{name}` is not a known comparison predicate")]
    UnknownPredicate { name: String },

    #[error("`{text}` is not a valid integer type")]
    InvalidWidth { text: String },

    #[error("The literal {literal} does not fit in {width} bits")]
    LiteralOutOfRange { literal: String, width: u32 },

    #[error("Signed literals wider than 64 bits are not supported, found {literal}")]
    SignedWideLiteral { literal: String },

    #[error("The block label `{label}` is not defined in this function")]
    UnknownLabel { label: String },

    #[error("The function `@{name}` is not declared or defined")]
    UnknownFunction { name: String },

    #[error("The function `@{name}` is declared or defined more than once")]
    DuplicateFunction { name: String },

    #[error("The block label `{label}` occurs more than once in this function")]
    DuplicateLabel { label: String },

    #[error("The value `%{name}` is assigned more than once")]
    DuplicateValue { name: String },

    #[error("The block `{label}` does not end in a terminator instruction")]
    MissingTerminator { label: String },

    #[error("The function `@{name}` is defined with an empty body")]
    EmptyBody { name: String },
}

/// A parse error with the source line on which it occurred.
pub type LocatedError = container::Located<Error>;

/// The result type for operations that may produce parse errors.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach source lines to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, line: u32) -> Self::Located {
        container::Located { line, payload: self }
    }
}
