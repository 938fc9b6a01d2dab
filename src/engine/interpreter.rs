//! This module contains the [`Interpreter`]: the dispatch loop that advances
//! a single execution context one instruction at a time, together with the
//! transfer function for every instruction in the IR.

use log::{debug, warn};
use z3::{
    ast::{Ast, Bool, BV},
    SatResult,
};

use crate::{
    constant::{ASSERT_INTRINSIC, ASSUME_INTRINSIC},
    engine::{
        context::Context,
        executor::Executor,
        frame::Frame,
        tracker::FailureTracker,
        Config,
    },
    error::execution::{Error, Result},
    ir::{BinaryOp, BlockId, FuncId, IcmpPred, Inst, Module, Operand, ValueId},
    smt::{sdiv_overflow, SymExpr},
    watchdog::DynWatchdog,
};

/// The outcome of a single transfer function.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExecutionResult {
    /// The context can continue with its next instruction.
    Continue,

    /// The context is finished, either because its outermost frame returned
    /// or because no successor of a branch was feasible.
    Stop,
}

/// The interpreter advances one execution context until it stops, pushing
/// any contexts forked at branches onto the executor's worklist.
///
/// It holds non-owning references into the run's state for the duration of
/// one interpretation; the context itself outlives it.
pub struct Interpreter<'ctx, 'run> {
    /// The context being advanced.
    ctx: &'run mut Context<'ctx>,

    /// The worklist that forked contexts are pushed onto.
    queue: &'run mut Executor<'ctx>,

    /// The solver context that terms are built in.
    z3: &'ctx z3::Context,

    /// The module being executed.
    module: &'run Module,

    /// The sink that failures are reported to.
    tracker: &'run mut dyn FailureTracker,

    /// The engine configuration.
    config: &'run Config,

    /// The watchdog polled between instructions.
    watchdog: DynWatchdog,

    /// The number of instructions executed so far, used to pace watchdog
    /// polling.
    steps: usize,
}

impl<'ctx, 'run> Interpreter<'ctx, 'run> {
    /// Constructs a new interpreter over the provided context.
    pub fn new(
        ctx: &'run mut Context<'ctx>,
        queue: &'run mut Executor<'ctx>,
        z3: &'ctx z3::Context,
        module: &'run Module,
        tracker: &'run mut dyn FailureTracker,
        config: &'run Config,
        watchdog: DynWatchdog,
    ) -> Self {
        Self { ctx, queue, z3, module, tracker, config, watchdog, steps: 0 }
    }

    /// Runs the context until it stops.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the watchdog requested a stop mid-path.
    pub fn execute(&mut self) -> Result<()> {
        let poll_interval = self.watchdog.poll_interval().max(1);

        loop {
            if self.steps % poll_interval == 0 && self.watchdog.should_interrupt() {
                return Err(Error::Interrupted);
            }
            self.steps += 1;

            if self.step() == ExecutionResult::Stop {
                return Ok(());
            }
        }
    }

    /// Executes a single instruction of the context.
    ///
    /// # Panics
    ///
    /// Panics if the cursor has run off the end of the current block, which
    /// means the input was missing a terminator.
    fn step(&mut self) -> ExecutionResult {
        let (func, block, index) = {
            let frame = self.ctx.top_mut();
            let position = (frame.func(), frame.block(), frame.cursor());

            // The cursor moves before dispatch so that branch, call, and
            // return transfer functions can overwrite the frame's position
            // freely.
            frame.advance();
            position
        };

        let module = self.module;
        let function = module.function(func);
        let insts = function.block(block).insts();
        assert!(
            index < insts.len(),
            "instruction cursor ran off the end of block `{}` in `@{}`",
            function.block(block).label(),
            function.name()
        );

        match &insts[index] {
            Inst::Binary { result, op, lhs, rhs } => self.binary(*result, *op, lhs, rhs),
            Inst::Not { result, operand } => self.bit_not(*result, operand),
            Inst::Icmp { result, pred, lhs, rhs } => self.icmp(*result, *pred, lhs, rhs),
            Inst::Trunc { result, operand, width } => self.trunc(*result, operand, *width),
            Inst::Select { result, cond, on_true, on_false } => {
                self.select(*result, cond, on_true, on_false)
            }
            Inst::Phi { result, incoming } => self.phi(*result, incoming),
            Inst::Br { target } => self.jump(*target),
            Inst::CondBr { cond, on_true, on_false } => self.branch(cond, *on_true, *on_false),
            Inst::Ret { value } => self.ret(value.as_ref()),
            Inst::Call { callee, args, .. } => self.call(*callee, args),
        }
    }

    /// Looks the operand up in the top frame.
    fn lookup(&self, operand: &Operand) -> SymExpr<'ctx> {
        self.ctx.top().lookup(operand, self.z3)
    }

    /// Looks the operand up and normalises it to bit-vector sort.
    fn lookup_int(&self, operand: &Operand) -> BV<'ctx> {
        self.lookup(operand).to_int().into_bitvec()
    }

    /// Looks the operand up and normalises it to boolean sort.
    fn lookup_bool(&self, operand: &Operand) -> Bool<'ctx> {
        self.lookup(operand).to_bool().into_bool()
    }

    /// Reports a failure witnessed by the model of the most recent check.
    ///
    /// A check that came back unknown still counts as a failure, but can
    /// leave the solver without even a candidate model; the report is
    /// dropped with a warning in that case, as the tracker interface has
    /// nothing to hand over.
    fn report_failure(&mut self) {
        match self.ctx.model() {
            Some(model) => self.tracker.add_failure(self.ctx, &model),
            None => warn!("a potential failure has no model; the check came back unknown"),
        }
    }

    fn binary(
        &mut self,
        result: ValueId,
        op: BinaryOp,
        lhs: &Operand,
        rhs: &Operand,
    ) -> ExecutionResult {
        let lhs = self.lookup_int(lhs);
        let rhs = self.lookup_int(rhs);

        // Division and remainder can fail; prove the divisor safe (or report
        // a counterexample) before materialising the result.
        match op {
            BinaryOp::UDiv | BinaryOp::URem => self.check_unsigned_division(&rhs),
            BinaryOp::SDiv | BinaryOp::SRem => self.check_signed_division(&lhs, &rhs),
            _ => {}
        }

        let value = match op {
            BinaryOp::Add => lhs.bvadd(&rhs),
            BinaryOp::Sub => lhs.bvsub(&rhs),
            BinaryOp::Mul => lhs.bvmul(&rhs),
            BinaryOp::UDiv => lhs.bvudiv(&rhs),
            BinaryOp::SDiv => lhs.bvsdiv(&rhs),
            BinaryOp::URem => lhs.bvurem(&rhs),
            BinaryOp::SRem => lhs.bvsrem(&rhs),
            BinaryOp::And => lhs.bvand(&rhs),
            BinaryOp::Or => lhs.bvor(&rhs),
            BinaryOp::Xor => lhs.bvxor(&rhs),
            BinaryOp::Shl => lhs.bvshl(&rhs),
            BinaryOp::LShr => lhs.bvlshr(&rhs),
            BinaryOp::AShr => lhs.bvashr(&rhs),
        };

        self.ctx.top_mut().insert(result, SymExpr::BitVec(value));
        ExecutionResult::Continue
    }

    /// Reports a failure unless the divisor of an unsigned division or
    /// remainder is provably nonzero on this path, then constrains the path
    /// to the safe case.
    fn check_unsigned_division(&mut self, rhs: &BV<'ctx>) {
        let zero = BV::from_u64(self.z3, 0, rhs.get_size());
        let divisor_zero = rhs._eq(&zero);

        // An unknown verdict counts as feasible, the same as at branches.
        if self.ctx.check_assuming(&SymExpr::Bool(divisor_zero.clone())) != SatResult::Unsat {
            self.report_failure();
        }
        self.ctx.add(divisor_zero.not());
    }

    /// Reports a failure unless a signed division or remainder is provably
    /// free of division by zero and overflow on this path, then constrains
    /// the path to the safe case.
    fn check_signed_division(&mut self, lhs: &BV<'ctx>, rhs: &BV<'ctx>) {
        let zero = BV::from_u64(self.z3, 0, rhs.get_size());
        let divisor_zero = rhs._eq(&zero);
        let overflow = sdiv_overflow(lhs, rhs);
        let unsafe_division = Bool::or(self.z3, &[&divisor_zero, &overflow]);

        // An unknown verdict counts as feasible, the same as at branches.
        if self.ctx.check_assuming(&SymExpr::Bool(unsafe_division)) != SatResult::Unsat {
            self.report_failure();
        }
        self.ctx.add(divisor_zero.not());
        self.ctx.add(overflow.not());
    }

    fn bit_not(&mut self, result: ValueId, operand: &Operand) -> ExecutionResult {
        let value = self.lookup_int(operand);
        self.ctx.top_mut().insert(result, SymExpr::BitVec(value.bvnot()));
        ExecutionResult::Continue
    }

    fn icmp(
        &mut self,
        result: ValueId,
        pred: IcmpPred,
        lhs: &Operand,
        rhs: &Operand,
    ) -> ExecutionResult {
        let lhs = self.lookup_int(lhs);
        let rhs = self.lookup_int(rhs);

        let value = match pred {
            IcmpPred::Eq => lhs._eq(&rhs),
            IcmpPred::Ne => lhs._eq(&rhs).not(),
            IcmpPred::Ult => lhs.bvult(&rhs),
            IcmpPred::Ule => lhs.bvule(&rhs),
            IcmpPred::Ugt => lhs.bvugt(&rhs),
            IcmpPred::Uge => lhs.bvuge(&rhs),
            IcmpPred::Slt => lhs.bvslt(&rhs),
            IcmpPred::Sle => lhs.bvsle(&rhs),
            IcmpPred::Sgt => lhs.bvsgt(&rhs),
            IcmpPred::Sge => lhs.bvsge(&rhs),
        };

        self.ctx.top_mut().insert(result, SymExpr::Bool(value));
        ExecutionResult::Continue
    }

    fn trunc(&mut self, result: ValueId, operand: &Operand, width: u32) -> ExecutionResult {
        let source = self.lookup_int(operand);
        assert!(
            width <= source.get_size(),
            "cannot truncate a {}-bit value to {width} bits",
            source.get_size()
        );

        let value = source.extract(width - 1, 0);
        self.ctx.top_mut().insert(result, SymExpr::BitVec(value));
        ExecutionResult::Continue
    }

    fn select(
        &mut self,
        result: ValueId,
        cond: &Operand,
        on_true: &Operand,
        on_false: &Operand,
    ) -> ExecutionResult {
        let cond = self.lookup_bool(cond);
        let on_true = self.lookup_int(on_true);
        let on_false = self.lookup_int(on_false);

        self.ctx.top_mut().insert(result, SymExpr::BitVec(cond.ite(&on_true, &on_false)));
        ExecutionResult::Continue
    }

    fn phi(&mut self, result: ValueId, incoming: &[(BlockId, Operand)]) -> ExecutionResult {
        let prev = self
            .ctx
            .top()
            .prev_block()
            .expect("phi node evaluated in a block with no predecessor");

        let operand = incoming
            .iter()
            .find(|(block, _)| *block == prev)
            .map(|(_, operand)| operand)
            .expect("phi node has no incoming value for the predecessor block");

        let value = self.lookup(operand);
        self.ctx.top_mut().insert(result, value);
        ExecutionResult::Continue
    }

    fn jump(&mut self, target: BlockId) -> ExecutionResult {
        self.ctx.top_mut().jump_to(target);
        ExecutionResult::Continue
    }

    fn branch(
        &mut self,
        cond: &Operand,
        on_true: BlockId,
        on_false: BlockId,
    ) -> ExecutionResult {
        let cond = self.lookup_bool(cond);

        // Unknown counts as feasible here: a later branch may make the path
        // decidable again, and overapproximating never loses a feasible
        // counterexample.
        let feasible_true =
            self.ctx.check_assuming(&SymExpr::Bool(cond.clone())) != SatResult::Unsat;
        let feasible_false =
            self.ctx.check_assuming(&SymExpr::Bool(cond.not())) != SatResult::Unsat;

        match (feasible_true, feasible_false) {
            (true, true) => {
                if self.fork_budget_exhausted() {
                    warn!(
                        "fork limit of {} reached; continuing on the false successor only",
                        self.config.max_forks.unwrap_or_default()
                    );
                    self.ctx.add(cond.not());
                    self.ctx.top_mut().jump_to(on_false);
                    return ExecutionResult::Continue;
                }

                // Both sides are live. The fork explores the true successor
                // while the current context takes the false one; leaving
                // loops first lets the queue explore the rest of the
                // function before revisiting loop bodies.
                let mut fork = self.ctx.fork();
                fork.add(cond.clone());
                fork.top_mut().jump_to(on_true);

                self.ctx.add(cond.not());
                self.ctx.top_mut().jump_to(on_false);

                self.queue.push(fork);
                debug!("forked at a conditional branch; {} contexts spawned", self.queue.spawned());
                ExecutionResult::Continue
            }
            (true, false) => {
                self.ctx.add(cond);
                self.ctx.top_mut().jump_to(on_true);
                ExecutionResult::Continue
            }
            (false, true) => {
                self.ctx.add(cond.not());
                self.ctx.top_mut().jump_to(on_false);
                ExecutionResult::Continue
            }
            (false, false) => ExecutionResult::Stop,
        }
    }

    fn fork_budget_exhausted(&self) -> bool {
        self.config.max_forks.is_some_and(|limit| self.queue.spawned() >= limit)
    }

    fn ret(&mut self, value: Option<&Operand>) -> ExecutionResult {
        let returned = value.map(|operand| self.lookup(operand));
        let _ = self.ctx.pop_frame();

        // Returning from the outermost frame ends the path.
        if self.ctx.frames().is_empty() {
            return ExecutionResult::Stop;
        }

        if let Some(returned) = returned {
            // The caller's cursor has already moved past its call
            // instruction, so the instruction just before it receives the
            // returned value.
            let module = self.module;
            let frame = self.ctx.top();
            let index = frame
                .cursor()
                .checked_sub(1)
                .expect("caller frame has not executed a call instruction");
            let caller = &module.function(frame.func()).block(frame.block()).insts()[index];

            if let Inst::Call { result: Some(id), .. } = caller {
                let id = *id;
                self.ctx.top_mut().insert(id, returned);
            }
        }

        ExecutionResult::Continue
    }

    fn call(&mut self, callee: FuncId, args: &[Operand]) -> ExecutionResult {
        let function = self.module.function(callee);
        if function.is_declaration() {
            return self.external_call(function.name(), args);
        }

        assert_eq!(
            function.params().len(),
            args.len(),
            "call to `@{}` passes {} arguments for {} parameters",
            function.name(),
            args.len(),
            function.params().len()
        );

        let mut frame = Frame::new(self.module, callee);
        for (param, arg) in function.params().iter().zip(args) {
            frame.insert(param.value, self.lookup(arg));
        }

        debug!("entering `@{}` at call depth {}", function.name(), self.ctx.frames().len());
        self.ctx.push_frame(frame);
        ExecutionResult::Continue
    }

    /// Dispatches a call to a body-less declaration.
    ///
    /// # Panics
    ///
    /// Panics when the declaration is not one of the recognised runtime
    /// entry points; the engine implements no other externals.
    fn external_call(&mut self, name: &str, args: &[Operand]) -> ExecutionResult {
        match name {
            ASSUME_INTRINSIC => self.assume(args),
            ASSERT_INTRINSIC => self.assert_property(args),
            _ => panic!("external function `@{name}` is not implemented"),
        }
    }

    fn assume(&mut self, args: &[Operand]) -> ExecutionResult {
        assert_eq!(args.len(), 1, "`@{ASSUME_INTRINSIC}` takes exactly one argument");
        let cond = self.lookup_bool(&args[0]);

        // No feasibility check here: assumptions are rare, solver calls are
        // expensive, and a contradictory path stops at its next branch
        // anyway.
        self.ctx.add(cond);
        ExecutionResult::Continue
    }

    fn assert_property(&mut self, args: &[Operand]) -> ExecutionResult {
        assert_eq!(args.len(), 1, "`@{ASSERT_INTRINSIC}` takes exactly one argument");
        let cond = self.lookup_bool(&args[0]);

        // A violation the solver cannot rule out is reported, so an unknown
        // verdict counts as feasible here too.
        if self.ctx.check_assuming(&SymExpr::Bool(cond.not())) != SatResult::Unsat {
            self.report_failure();
        }
        self.ctx.add(cond);
        ExecutionResult::Continue
    }
}
