//! This module contains the engine's view of the SMT solver: a two-sorted
//! symbolic expression, the normalisation rules that bridge the IR's
//! "1-bit integer is a boolean" convention with the solver's distinct sorts,
//! and the evaluation of IR constants into solver terms.

use z3::ast::{Ast, Bool, BV};

use crate::ir::{ConstValue, Constant};

/// A solver-backed term of either boolean or bit-vector sort.
///
/// The IR treats 1-bit integers and booleans interchangeably, while the
/// solver keeps them as separate sorts. Every transfer function normalises
/// its operands with [`SymExpr::to_int`] or [`SymExpr::to_bool`] before
/// building on them, so both representations flow through the engine.
#[derive(Clone, Debug)]
pub enum SymExpr<'ctx> {
    /// A term of boolean sort.
    Bool(Bool<'ctx>),

    /// A term of bit-vector sort, of any width.
    BitVec(BV<'ctx>),
}

impl<'ctx> SymExpr<'ctx> {
    /// Normalises the expression towards boolean sort.
    ///
    /// A 1-bit bit-vector `e` becomes `e == 1`; everything else is returned
    /// unchanged. Note that the guard is on the expression being a
    /// bit-vector of width one, not on it being any integer.
    #[must_use]
    pub fn to_bool(&self) -> Self {
        match self {
            Self::BitVec(bv) if bv.get_size() == 1 => {
                let one = BV::from_u64(bv.get_ctx(), 1, 1);
                Self::Bool(bv._eq(&one))
            }
            other => other.clone(),
        }
    }

    /// Normalises the expression towards bit-vector sort.
    ///
    /// A boolean `b` becomes `ite(b, 1, 0)` over 1-bit bit-vectors;
    /// everything else is returned unchanged.
    #[must_use]
    pub fn to_int(&self) -> Self {
        match self {
            Self::Bool(b) => {
                let ctx = b.get_ctx();
                let one = BV::from_u64(ctx, 1, 1);
                let zero = BV::from_u64(ctx, 0, 1);
                Self::BitVec(b.ite(&one, &zero))
            }
            other => other.clone(),
        }
    }

    /// Unwraps the expression as a boolean term.
    ///
    /// # Panics
    ///
    /// Panics if the expression is a bit-vector. Callers normalise with
    /// [`Self::to_bool`] first, so reaching the panic means the IR used a
    /// multi-bit value where a boolean was required.
    #[must_use]
    pub fn into_bool(self) -> Bool<'ctx> {
        match self {
            Self::Bool(b) => b,
            Self::BitVec(bv) => panic!(
                "expected a boolean expression, found a bit-vector of width {}",
                bv.get_size()
            ),
        }
    }

    /// Unwraps the expression as a bit-vector term.
    ///
    /// # Panics
    ///
    /// Panics if the expression is a boolean. Callers normalise with
    /// [`Self::to_int`] first, so reaching the panic is a programmer bug.
    #[must_use]
    pub fn into_bitvec(self) -> BV<'ctx> {
        match self {
            Self::BitVec(bv) => bv,
            Self::Bool(_) => panic!("expected a bit-vector expression, found a boolean"),
        }
    }

    /// Checks whether the expression is of boolean sort.
    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }
}

/// Evaluates an IR constant into a bit-vector term of the constant's width.
///
/// Values up to a machine word are built directly; anything wider goes
/// through the solver's decimal-string constructor, which is the only
/// practical route for wide literals.
///
/// # Panics
///
/// Panics if the solver rejects a wide literal's digits. The parser only
/// produces well-formed decimal renderings, so this is a programmer bug.
#[must_use]
pub fn evaluate_constant<'ctx>(z3: &'ctx z3::Context, constant: &Constant) -> SymExpr<'ctx> {
    let bv = match &constant.value {
        ConstValue::Word(value) => BV::from_u64(z3, *value, constant.width),
        ConstValue::Wide(digits) => BV::from_str(z3, constant.width, digits)
            .unwrap_or_else(|| panic!("malformed wide integer literal `{digits}`")),
    };
    SymExpr::BitVec(bv)
}

/// Creates the fresh symbolic bit-vector standing for the argument at
/// `index` of the function under execution.
///
/// Argument symbols are numbered by position, which keeps them distinct
/// within a run and recognisable in reported models.
#[must_use]
pub fn argument<'ctx>(z3: &'ctx z3::Context, index: u32, width: u32) -> SymExpr<'ctx> {
    SymExpr::BitVec(BV::new_const(z3, z3::Symbol::Int(index), width))
}

/// Builds the signed-division overflow predicate for `lhs / rhs`.
///
/// The only overflowing case in two's complement division is the most
/// negative value divided by minus one, whose true quotient is not
/// representable in the operand width.
#[must_use]
pub fn sdiv_overflow<'ctx>(lhs: &BV<'ctx>, rhs: &BV<'ctx>) -> Bool<'ctx> {
    let z3 = lhs.get_ctx();
    let width = lhs.get_size();
    let int_min =
        BV::from_u64(z3, 1, width).bvshl(&BV::from_u64(z3, u64::from(width - 1), width));
    let minus_one = BV::from_u64(z3, 0, width).bvnot();
    Bool::and(z3, &[&lhs._eq(&int_min), &rhs._eq(&minus_one)])
}

/// Creates a solver context configured the way the engine expects: model
/// generation enabled and automatic solver configuration on.
#[must_use]
pub fn solver_context() -> z3::Context {
    let mut cfg = z3::Config::new();
    cfg.set_model_generation(true);
    cfg.set_bool_param_value("auto_config", true);
    z3::Context::new(&cfg)
}

#[cfg(test)]
mod test {
    use z3::{
        ast::{Ast, Bool, BV},
        SatResult, Solver,
    };

    use crate::{
        ir::Constant,
        smt::{argument, evaluate_constant, sdiv_overflow, solver_context, SymExpr},
    };

    /// Checks that `lhs` and `rhs` cannot differ under any assignment.
    fn assert_equivalent<'ctx>(z3: &'ctx z3::Context, lhs: &BV<'ctx>, rhs: &BV<'ctx>) {
        let solver = Solver::new(z3);
        solver.assert(&lhs._eq(rhs).not());
        assert_eq!(solver.check(), SatResult::Unsat);
    }

    #[test]
    fn to_bool_converts_single_bit_vectors() {
        let z3 = solver_context();
        let bit = SymExpr::BitVec(BV::new_const(&z3, "bit", 1));

        assert!(bit.to_bool().is_bool());
        assert!(!bit.to_bool().to_int().is_bool());
    }

    #[test]
    fn to_bool_leaves_wider_vectors_untouched() {
        let z3 = solver_context();
        let word = SymExpr::BitVec(BV::new_const(&z3, "word", 32));

        assert!(!word.to_bool().is_bool());
    }

    #[test]
    fn normalisation_round_trips_single_bit_vectors() {
        let z3 = solver_context();
        let bit = BV::new_const(&z3, "bit", 1);

        let round_tripped = SymExpr::BitVec(bit.clone()).to_bool().to_int().into_bitvec();
        assert_equivalent(&z3, &bit, &round_tripped);
    }

    #[test]
    fn normalisation_round_trips_booleans() {
        let z3 = solver_context();
        let flag = Bool::new_const(&z3, "flag");

        let round_tripped = SymExpr::Bool(flag.clone()).to_int().to_bool().into_bool();
        let solver = Solver::new(&z3);
        solver.assert(&flag._eq(&round_tripped).not());
        assert_eq!(solver.check(), SatResult::Unsat);
    }

    #[test]
    fn word_constants_match_native_literals() {
        let z3 = solver_context();

        let evaluated = evaluate_constant(&z3, &Constant::word(0xdead_beef, 32)).into_bitvec();
        let expected = BV::from_u64(&z3, 0xdead_beef, 32);
        assert_equivalent(&z3, &evaluated, &expected);
    }

    #[test]
    fn wide_constants_match_their_value() {
        let z3 = solver_context();

        // 36893488147419103232 is 2^65, which cannot be built from a machine
        // word directly.
        let evaluated =
            evaluate_constant(&z3, &Constant::wide("36893488147419103232", 128)).into_bitvec();
        let expected =
            BV::from_u64(&z3, 1, 128).bvshl(&BV::from_u64(&z3, 65, 128));
        assert_equivalent(&z3, &evaluated, &expected);
    }

    #[test]
    fn arguments_are_bit_vectors_of_the_requested_width() {
        let z3 = solver_context();

        let arg = argument(&z3, 0, 32).into_bitvec();
        assert_eq!(arg.get_size(), 32);
    }

    #[test]
    fn sdiv_overflow_flags_only_int_min_by_minus_one() {
        let z3 = solver_context();

        let int_min = BV::from_u64(&z3, 0x80, 8);
        let minus_one = BV::from_u64(&z3, 0xff, 8);
        let five = BV::from_u64(&z3, 5, 8);

        let solver = Solver::new(&z3);
        solver.assert(&sdiv_overflow(&int_min, &minus_one).not());
        assert_eq!(solver.check(), SatResult::Unsat);

        let solver = Solver::new(&z3);
        solver.assert(&sdiv_overflow(&five, &minus_one));
        assert_eq!(solver.check(), SatResult::Unsat);

        let solver = Solver::new(&z3);
        solver.assert(&sdiv_overflow(&int_min, &five));
        assert_eq!(solver.check(), SatResult::Unsat);
    }
}
