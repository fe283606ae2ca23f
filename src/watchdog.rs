//! This module contains the type definitions that allow a client to stop a
//! long-running synthesis from outside.
//!
//! # Cooperative Cancellation
//!
//! The watchdog is only polled by the interpreter loop, once every
//! [`Watchdog::poll_every`] steps. Disassembly and finalization are bounded by
//! the size of the code and of the trace respectively, and are never
//! interrupted.

use std::{
    cell::Cell,
    fmt::Debug,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::constant::DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;

/// A dynamically dispatched [`Watchdog`] instance.
pub type DynWatchdog = Rc<dyn Watchdog>;

/// The interface to an object that can be polled to see if the synthesizer needs
/// to abort processing.
///
/// The interface is simple, but it can encapsulate arbitrary logic as far as
/// the synthesizer is concerned, allowing the client to implement complex stop
/// logic.
pub trait Watchdog
where
    Self: Debug,
{
    /// Checks if the synthesizer should stop executing and return an error.
    #[must_use]
    fn should_stop(&self) -> bool;

    /// Gets the number of loop iterations the synthesizer should wait before
    /// polling the watchdog.
    #[must_use]
    fn poll_every(&self) -> usize;
}

/// An implementation of the [`Watchdog`] trait that does not place any
/// restrictions on the execution of the synthesizer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LazyWatchdog;

impl LazyWatchdog {
    /// Wraps `self` into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> Rc<dyn Watchdog> {
        Rc::new(self)
    }
}

impl Watchdog for LazyWatchdog {
    fn should_stop(&self) -> bool {
        false
    }

    fn poll_every(&self) -> usize {
        // Something ridiculously huge so it basically never gets checked.
        1_000_000_000_000
    }
}

/// A watchdog that tells the synthesizer when to stop based on a flag in the form
/// of an atomic boolean.
///
/// By default, it requests that the synthesizer poll for watchdog status every
/// [`DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS`]. This is configurable by calling
/// [`Self::polling_every`].
#[derive(Clone, Debug)]
pub struct FlagWatchdog {
    /// The flag that should be mutated externally to stop the synthesizer by this
    /// watchdog.
    flag: Arc<AtomicBool>,

    /// The number of loop iterations the synthesizer should wait before polling
    /// the watchdog.
    poll_loop_iterations: usize,
}

impl FlagWatchdog {
    /// Constructs a new `FlagWatchdog` wrapping the provided `flag`.
    #[must_use]
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        let poll_loop_iterations = DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;
        Self {
            flag,
            poll_loop_iterations,
        }
    }

    /// Specifies the number of loop iterations that the synthesizer should wait
    /// before polling the watchdog for status.
    #[must_use]
    pub fn polling_every(mut self, iterations: usize) -> Self {
        self.poll_loop_iterations = iterations;
        self
    }

    /// Wraps the watchdog into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> Rc<dyn Watchdog> {
        Rc::new(self)
    }
}

impl Watchdog for FlagWatchdog {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn poll_every(&self) -> usize {
        self.poll_loop_iterations
    }
}

/// A watchdog that asks the synthesizer to stop after it has been polled a
/// fixed number of times.
///
/// This is primarily useful for bounding runs in tests.
#[derive(Debug)]
pub struct PollCountWatchdog {
    remaining: Cell<usize>,
}

impl PollCountWatchdog {
    /// Constructs a watchdog that allows `polls` polls before requesting a
    /// stop, and that is polled on every step.
    #[must_use]
    pub fn new(polls: usize) -> Self {
        let remaining = Cell::new(polls);
        Self { remaining }
    }

    /// Wraps the watchdog into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> Rc<dyn Watchdog> {
        Rc::new(self)
    }
}

impl Watchdog for PollCountWatchdog {
    fn should_stop(&self) -> bool {
        let remaining = self.remaining.get();
        if remaining == 0 {
            return true;
        }
        self.remaining.set(remaining - 1);
        false
    }

    fn poll_every(&self) -> usize {
        1
    }
}
