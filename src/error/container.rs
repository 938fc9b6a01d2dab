use std::fmt::Formatter;

use thiserror::Error;

/// An error that is localised to a particular line of the IR source text.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The one-based line in the source text where the error occurred.
    pub line: u32,

    /// The error data.
    pub payload: E,
}

/// Displays the error together with the source line on which it occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.payload)
    }
}

/// A trait for types that can have a source line attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached source line.
    type Located;

    /// Attaches the one-based source `line` to the error.
    fn locate(self, line: u32) -> Self::Located;
}

/// A blanket implementation that allows for attaching a line to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, line: u32) -> Self::Located {
        self.map_err(|e| Located { line, payload: e })
    }
}
