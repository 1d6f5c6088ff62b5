//! Critical section handling
//!
//! Two layers over the port's status register primitives:
//! - token functions ([`enter`]/[`exit`] and the `_from_isr` pair), where the
//!   caller threads the returned [`IntState`] back into the matching exit
//! - the RAII [`CriticalSection`] guard, built on the token functions
//!
//! Nesting is obtained by threading tokens, not by a counter: a nested
//! `enter` returns "already disabled" and its `exit` leaves interrupts
//! disabled. Exits must pair with enters in reverse order; a mismatch is not
//! detected.

use crate::port::{self, ActivePort, IntPort};

/// Interrupt-enable state captured by an enter call
///
/// Restore it exactly once, at the same nesting depth it was taken.
#[must_use = "interrupts stay disabled until the state is passed to exit"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntState<S>(S);

impl<S: Copy> IntState<S> {
    /// Raw saved status
    #[inline(always)]
    pub fn raw(&self) -> S {
        self.0
    }
}

/// Disable interrupts on `port`, returning the previous state
#[inline(always)]
pub fn enter_with<P: IntPort + ?Sized>(port: &P) -> IntState<P::Status> {
    IntState(port.status_save_int_dis())
}

/// Restore the state returned by the matching [`enter_with`]
#[inline(always)]
pub fn exit_with<P: IntPort + ?Sized>(port: &P, state: IntState<P::Status>) {
    port.status_restore(state.0);
}

/// [`enter_with`] for code already running inside an interrupt
///
/// Skips any task/interrupt context check the task-level variant might grow.
#[inline(always)]
pub fn enter_from_isr_with<P: IntPort + ?Sized>(port: &P) -> IntState<P::Status> {
    IntState(port.status_save_int_dis())
}

/// [`exit_with`] for code already running inside an interrupt
#[inline(always)]
pub fn exit_from_isr_with<P: IntPort + ?Sized>(port: &P, state: IntState<P::Status>) {
    port.status_restore(state.0);
}

/// Saved state of the active port
pub type ActiveIntState = IntState<<ActivePort as IntPort>::Status>;

/// Disable interrupts and return the previous state
#[inline(always)]
pub fn enter() -> ActiveIntState {
    enter_with(port::active())
}

/// Restore the state returned by the matching [`enter`]
#[inline(always)]
pub fn exit(state: ActiveIntState) {
    exit_with(port::active(), state)
}

/// [`enter`] for use inside an interrupt handler
#[inline(always)]
pub fn enter_from_isr() -> ActiveIntState {
    enter_from_isr_with(port::active())
}

/// [`exit`] for use inside an interrupt handler
#[inline(always)]
pub fn exit_from_isr(state: ActiveIntState) {
    exit_from_isr_with(port::active(), state)
}

/// Returns true if interrupts are globally disabled
#[inline(always)]
pub fn is_int_disabled() -> bool {
    port::active().is_int_disabled()
}

/// RAII guard for critical sections
///
/// When this guard is created, interrupts are disabled.
/// When it is dropped, interrupts are restored to their previous state,
/// so guards nest.
pub struct CriticalSection {
    saved: ActiveIntState,
}

impl CriticalSection {
    /// Enter a critical section by disabling interrupts.
    ///
    /// Returns a guard that will restore interrupt state when dropped.
    #[inline(always)]
    pub fn enter() -> Self {
        CriticalSection { saved: enter() }
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        exit(self.saved);
    }
}

/// Execute a closure with interrupts disabled
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}
