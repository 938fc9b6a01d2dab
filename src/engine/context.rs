//! This module contains the definition of the [`Context`] type, representing
//! one path of execution: a call stack of frames together with the solver
//! that owns the path condition accumulated along the way.

use z3::{ast::Bool, SatResult, Solver};

use crate::{
    engine::frame::Frame,
    ir::{FuncId, Module},
    smt::{self, SymExpr},
};

/// A single path's worth of execution state.
///
/// Each context owns its solver instance; the assertions accumulated in it
/// are exactly the path condition that brought the context to its current
/// position. Forking produces a second, fully independent context so that
/// both sides of a branch can be explored.
#[derive(Debug)]
pub struct Context<'ctx> {
    /// The solver context that all terms and solvers are built in. This is
    /// shared between every context of a run.
    z3: &'ctx z3::Context,

    /// The call stack, topmost (most recent callee) frame last.
    stack: Vec<Frame<'ctx>>,

    /// The solver holding the path condition for this context.
    solver: Solver<'ctx>,

    /// The assertions added to `solver`, kept so that forks can rebuild an
    /// identical solver and so that diagnostics can render the path
    /// condition.
    path: Vec<Bool<'ctx>>,
}

impl<'ctx> Context<'ctx> {
    /// Constructs the initial context for executing `func`.
    ///
    /// The context starts with a single frame in which every parameter of
    /// `func` is bound to a fresh symbolic bit-vector of the parameter's
    /// width, numbered by position.
    ///
    /// # Panics
    ///
    /// Panics if `func` is a declaration. The driver validates the target
    /// before building a context, so this is a programmer bug.
    #[must_use]
    pub fn new(z3: &'ctx z3::Context, module: &Module, func: FuncId) -> Self {
        let function = module.function(func);
        let mut frame = Frame::new(module, func);
        for (index, param) in function.params().iter().enumerate() {
            let index = u32::try_from(index).expect("too many parameters");
            frame.insert(param.value, smt::argument(z3, index, param.width));
        }

        let solver = Solver::new(z3);
        Self { z3, stack: vec![frame], solver, path: vec![] }
    }

    /// Gets the topmost stack frame.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty. Execution stops when the outermost
    /// frame returns, so this is a programmer bug.
    #[must_use]
    pub fn top(&self) -> &Frame<'ctx> {
        self.stack.last().expect("no stack frames remain in this context")
    }

    /// Gets the topmost stack frame for modification.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty. This is a programmer bug.
    #[must_use]
    pub fn top_mut(&mut self) -> &mut Frame<'ctx> {
        self.stack.last_mut().expect("no stack frames remain in this context")
    }

    /// Gets the call stack, outermost frame first.
    #[must_use]
    pub fn frames(&self) -> &[Frame<'ctx>] {
        self.stack.as_slice()
    }

    /// Pushes `frame` as the new topmost frame.
    pub fn push_frame(&mut self, frame: Frame<'ctx>) {
        self.stack.push(frame);
    }

    /// Pops and returns the topmost frame.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty. This is a programmer bug.
    pub fn pop_frame(&mut self) -> Frame<'ctx> {
        self.stack.pop().expect("no stack frames remain in this context")
    }

    /// Appends `assertion` to the path condition.
    pub fn add(&mut self, assertion: Bool<'ctx>) {
        self.solver.assert(&assertion);
        self.path.push(assertion);
    }

    /// Queries the solver about the path condition as it stands.
    #[must_use]
    pub fn check(&self) -> SatResult {
        self.solver.check()
    }

    /// Queries the solver about the path condition extended with one extra
    /// `assumption`, without changing the path condition itself.
    ///
    /// # Panics
    ///
    /// Panics if the assumption is not boolean after normalisation with
    /// [`SymExpr::to_bool`].
    #[must_use]
    pub fn check_assuming(&self, assumption: &SymExpr<'ctx>) -> SatResult {
        let cond = assumption.to_bool().into_bool();
        self.solver.check_assumptions(&[cond])
    }

    /// Gets the model for the most recent satisfiable check.
    #[must_use]
    pub fn model(&self) -> Option<z3::Model<'ctx>> {
        self.solver.get_model()
    }

    /// Gets the path condition of this context, in the order it was
    /// accumulated.
    #[must_use]
    pub fn path(&self) -> &[Bool<'ctx>] {
        self.path.as_slice()
    }

    /// Forks the context into a second, independent one.
    ///
    /// The fork gets its own solver containing an exact copy of the current
    /// assertion set and a clone of the call stack. Assertions added to
    /// either context afterwards are invisible to the other.
    #[must_use]
    pub fn fork(&self) -> Self {
        let solver = Solver::new(self.z3);
        for assertion in &self.path {
            solver.assert(assertion);
        }

        Self { z3: self.z3, stack: self.stack.clone(), solver, path: self.path.clone() }
    }
}
