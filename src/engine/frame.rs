//! This module contains the definition of the [`Frame`] type, the per-call
//! symbolic environment of an execution context.

use std::collections::HashMap;

use crate::{
    ir::{BlockId, FuncId, Module, Operand, ValueId},
    smt::{evaluate_constant, SymExpr},
};

/// A single stack frame of an execution context.
///
/// The frame tracks where execution is within a function (the current block
/// and an instruction cursor), where control flow arrived from (needed to
/// resolve phi nodes), and the symbolic expression bound to every SSA value
/// defined so far along the executed path.
#[derive(Clone, Debug)]
pub struct Frame<'ctx> {
    /// The function this frame is executing.
    func: FuncId,

    /// The symbolic store for SSA values defined along the executed path.
    ///
    /// Constants are never stored here; they are materialised on lookup.
    variables: HashMap<ValueId, SymExpr<'ctx>>,

    /// The block currently being executed.
    block: BlockId,

    /// The block execution arrived from. Absent only while the frame is
    /// still in its entry block, where no phi node can occur.
    prev_block: Option<BlockId>,

    /// The index of the next instruction to execute within `block`.
    cursor: usize,
}

impl<'ctx> Frame<'ctx> {
    /// Constructs a new frame positioned at the start of the entry block of
    /// `func`, with an empty symbolic store.
    ///
    /// # Panics
    ///
    /// Panics if `func` is a declaration, as those have no entry block. This
    /// is a programmer bug.
    #[must_use]
    pub fn new(module: &Module, func: FuncId) -> Self {
        let block = module.function(func).entry();
        Self { func, variables: HashMap::new(), block, prev_block: None, cursor: 0 }
    }

    /// Gets the function this frame is executing.
    #[must_use]
    pub fn func(&self) -> FuncId {
        self.func
    }

    /// Gets the block currently being executed.
    #[must_use]
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Gets the block execution arrived from, if any.
    #[must_use]
    pub fn prev_block(&self) -> Option<BlockId> {
        self.prev_block
    }

    /// Gets the index of the next instruction to execute within the current
    /// block.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor past the instruction it points at.
    pub fn advance(&mut self) {
        self.cursor += 1;
    }

    /// Repositions the frame at the start of `block`, remembering the block
    /// it came from for phi resolution.
    pub fn jump_to(&mut self, block: BlockId) {
        self.prev_block = Some(self.block);
        self.block = block;
        self.cursor = 0;
    }

    /// Binds `value` to `expr`, overwriting any previous binding.
    ///
    /// Well-formed SSA input never re-binds a value, but overwriting keeps
    /// the store well-defined if it does.
    pub fn insert(&mut self, value: ValueId, expr: SymExpr<'ctx>) {
        self.variables.insert(value, expr);
    }

    /// Looks up the symbolic expression for `operand`.
    ///
    /// Constants are materialised directly in the solver context; SSA values
    /// are read from the store.
    ///
    /// # Panics
    ///
    /// Panics when an SSA value has no binding. Execution only reaches a use
    /// after its definition, so this indicates malformed input or an engine
    /// bug.
    #[must_use]
    pub fn lookup(&self, operand: &Operand, z3: &'ctx z3::Context) -> SymExpr<'ctx> {
        match operand {
            Operand::Const(constant) => evaluate_constant(z3, constant),
            Operand::Value(id) => self
                .variables
                .get(id)
                .cloned()
                .unwrap_or_else(|| panic!("tried to access unknown variable {}", id.index())),
        }
    }

    /// Gets the binding for `value`, if one exists.
    #[must_use]
    pub fn get(&self, value: ValueId) -> Option<&SymExpr<'ctx>> {
        self.variables.get(value)
    }
}
