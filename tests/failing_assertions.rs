//! End-to-end tests for assertions whose violation the engine must witness
//! with a concrete model.

mod common;

use common::failures_in;
use decaf::{
    engine::{self, context::Context, tracker::FailureTracker, Config},
    ir::{parser::parse_module, ValueId},
    watchdog::NoWatchdog,
};

const ASSERT_X_IS_ZERO: &str = r"
    declare @decaf_assert(i1)

    define @test(%x: i32) {
    entry:
      %c = icmp.eq %x, 0:i32
      call @decaf_assert(%c)
      ret
    }
    ";

/// A tracker that records the concrete value the model assigns to one
/// argument of the function under test.
struct ArgumentCapture {
    argument: ValueId,
    seen: Vec<u64>,
}

impl FailureTracker for ArgumentCapture {
    fn add_failure<'ctx>(&mut self, ctx: &Context<'ctx>, model: &z3::Model<'ctx>) {
        let bound = ctx
            .top()
            .get(self.argument)
            .expect("the argument is bound in the failing frame")
            .clone()
            .into_bitvec();
        let concrete = model
            .eval(&bound, true)
            .and_then(|v| v.as_u64())
            .expect("the model assigns the argument");
        self.seen.push(concrete);
    }
}

#[test]
fn asserting_an_argument_is_zero_fails() -> anyhow::Result<()> {
    let failures = failures_in(ASSERT_X_IS_ZERO, "test")?;
    assert_eq!(failures, 1);

    Ok(())
}

#[test]
fn the_witness_maps_the_argument_to_a_nonzero_value() -> anyhow::Result<()> {
    let module = parse_module(ASSERT_X_IS_ZERO)?;
    let target = module.function_named("test").expect("function exists");
    let argument = module.function(target).params()[0].value;

    let mut tracker = ArgumentCapture { argument, seen: vec![] };
    engine::run(&module, target, &Config::default(), &mut tracker, NoWatchdog.shared())?;

    assert_eq!(tracker.seen.len(), 1);
    assert_ne!(tracker.seen[0], 0);

    Ok(())
}
