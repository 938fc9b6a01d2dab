//! This module contains the [`Executor`], the worklist of execution contexts
//! that are waiting to be explored.

use crate::engine::context::Context;

/// A last-in, first-out worklist of pending execution contexts.
///
/// The LIFO order means the engine explores depth-first: the context forked
/// most recently is picked up next. Combined with the branch heuristic of
/// continuing on the false successor, this tends to finish loop exits before
/// revisiting loop bodies.
#[derive(Debug, Default)]
pub struct Executor<'ctx> {
    /// The pending contexts, most recently pushed last.
    contexts: Vec<Context<'ctx>>,

    /// The total number of contexts pushed over the lifetime of the
    /// executor, counting the initial one.
    spawned: usize,
}

impl<'ctx> Executor<'ctx> {
    /// Constructs a new, empty executor.
    #[must_use]
    pub fn new() -> Self {
        Self { contexts: Vec::new(), spawned: 0 }
    }

    /// Pushes `ctx` onto the worklist.
    pub fn push(&mut self, ctx: Context<'ctx>) {
        self.spawned += 1;
        self.contexts.push(ctx);
    }

    /// Pops the most recently pushed context.
    ///
    /// # Panics
    ///
    /// Panics if the worklist is empty; callers gate on [`Self::has_next`].
    /// This is a programmer bug.
    #[must_use]
    pub fn pop(&mut self) -> Context<'ctx> {
        self.contexts.pop().expect("no execution contexts remain on the worklist")
    }

    /// Checks whether any contexts are waiting to be explored.
    #[must_use]
    pub fn has_next(&self) -> bool {
        !self.contexts.is_empty()
    }

    /// Gets the number of contexts currently waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.contexts.len()
    }

    /// Gets the total number of contexts pushed over the lifetime of the
    /// executor, counting the initial one.
    #[must_use]
    pub fn spawned(&self) -> usize {
        self.spawned
    }
}
