//! Event loop driving
//!
//! The client never spawns threads. Callers either pump a display once per
//! call ([`crate::Display::pump_once`]) or hand it a [`Process`] and let
//! [`crate::Display::run_until`] pump until the process says there is no
//! more work.

/// Outcome of a single pump. Both variants are success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// One native event-loop iteration ran
    Dispatched,
    /// Nothing ran: the context is not running, or the display is already
    /// being pumped further up the current thread's stack
    Skipped,
}

impl PumpStatus {
    pub fn dispatched(&self) -> bool {
        matches!(self, PumpStatus::Dispatched)
    }
}

/// Caller-supplied "is there more work" capability
pub trait Process {
    /// Called before every pump; returning `false` ends the loop
    fn dispatch(&mut self) -> bool;
}

impl<F> Process for F
where
    F: FnMut() -> bool,
{
    fn dispatch(&mut self) -> bool {
        self()
    }
}

/// Process that dispatches a fixed number of times
#[derive(Debug, Clone)]
pub struct IterationBudget {
    remaining: u64,
}

impl IterationBudget {
    pub fn new(iterations: u64) -> Self {
        Self {
            remaining: iterations,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Process for IterationBudget {
    fn dispatch(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Drive `pump` while `process` reports more work; returns the number of
/// iterations that actually dispatched
pub(crate) fn run_until<P, F>(process: &mut P, mut pump: F) -> u64
where
    P: Process + ?Sized,
    F: FnMut() -> PumpStatus,
{
    let mut dispatched = 0;
    while process.dispatch() {
        if pump().dispatched() {
            dispatched += 1;
        }
    }
    dispatched
}
