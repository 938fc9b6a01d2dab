//! This module contains the means by which a running exploration can be cut
//! short from the outside.
//!
//! # Best-Effort Monitoring
//!
//! Interruption is cooperative. The interpreter consults the watchdog
//! between instructions, so a request only takes effect once the current
//! solver query has returned; there is no way to interrupt the solver in
//! the middle of a check.

use std::{
    fmt::Debug,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::constant::DEFAULT_WATCHDOG_POLL_STEPS;

/// A dynamically dispatched [`Watchdog`] instance, shared by the driver and
/// the interpreters it spawns.
pub type DynWatchdog = Rc<dyn Watchdog>;

/// The interface to an object that decides whether an exploration should be
/// cut short.
///
/// Implementations can encapsulate arbitrary stop conditions; the engine
/// only ever asks the two questions below.
pub trait Watchdog
where
    Self: Debug,
{
    /// Checks whether the exploration should stop and report an
    /// interruption.
    #[must_use]
    fn should_interrupt(&self) -> bool;

    /// Gets the number of interpreter steps to let pass between
    /// consultations.
    #[must_use]
    fn poll_interval(&self) -> usize;
}

/// The watchdog for unbounded runs: it never interrupts, and asks to be
/// consulted as rarely as possible.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NoWatchdog;

impl NoWatchdog {
    /// Wraps `self` for handing to the driver.
    #[must_use]
    pub fn shared(self) -> DynWatchdog {
        Rc::new(self)
    }
}

impl Watchdog for NoWatchdog {
    fn should_interrupt(&self) -> bool {
        false
    }

    fn poll_interval(&self) -> usize {
        usize::MAX
    }
}

/// A watchdog backed by a shared flag, typically raised from a signal
/// handler or another thread while the engine runs.
#[derive(Clone, Debug)]
pub struct InterruptWatchdog {
    /// The flag that is raised externally to stop the engine.
    interrupted: Arc<AtomicBool>,

    /// How many interpreter steps pass between consultations of the flag.
    poll_interval: usize,
}

impl InterruptWatchdog {
    /// Constructs a new watchdog that interrupts the exploration once
    /// `interrupted` is raised.
    ///
    /// The flag is consulted every [`DEFAULT_WATCHDOG_POLL_STEPS`]
    /// interpreter steps unless [`Self::polling_every_steps`] says
    /// otherwise.
    #[must_use]
    pub fn new(interrupted: Arc<AtomicBool>) -> Self {
        Self { interrupted, poll_interval: DEFAULT_WATCHDOG_POLL_STEPS }
    }

    /// Sets how many interpreter steps pass between consultations of the
    /// flag. Lower values react faster at the cost of more polling.
    #[must_use]
    pub fn polling_every_steps(mut self, steps: usize) -> Self {
        self.poll_interval = steps;
        self
    }

    /// Wraps `self` for handing to the driver.
    #[must_use]
    pub fn shared(self) -> DynWatchdog {
        Rc::new(self)
    }
}

impl Watchdog for InterruptWatchdog {
    fn should_interrupt(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed)
    }

    fn poll_interval(&self) -> usize {
        self.poll_interval
    }
}
