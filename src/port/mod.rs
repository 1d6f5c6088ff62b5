//! Port layer - CPU-specific primitives
//!
//! Everything above this module is written once against two traits:
//! - [`IntPort`]: interrupt enable state, the pending switch signal and the
//!   halt used by the fatal hook
//! - [`StackPort`]: the register-level primitives a vector trampoline needs
//!   (stack pointer access, register bank reconciliation, exception state
//!   and the two register save sets)
//!
//! The trampoline built on [`StackPort`] must be entered with no
//! compiler-inserted register preservation other than what the selected
//! [`ContextSave`](crate::trampoline::ContextSave) variant performs itself.

use crate::types::OsIntLevel;

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::{CortexM as ActivePort, PORT};

// Host implementations (for testing)
#[cfg(not(target_arch = "arm"))]
pub mod sim;

#[cfg(not(target_arch = "arm"))]
pub mod stub;

#[cfg(not(target_arch = "arm"))]
pub use stub::{Stub as ActivePort, PORT};

/// The port used by the free-standing critical section functions
#[inline(always)]
pub fn active() -> &'static ActivePort {
    &PORT
}

/// Interrupt-enable primitives
pub trait IntPort {
    /// Snapshot of the processor status holding the global enable bit
    type Status: Copy + PartialEq + core::fmt::Debug;

    /// Disable interrupts and return the previous status, atomically
    fn status_save_int_dis(&self) -> Self::Status;

    /// Write back a status returned by [`status_save_int_dis`](Self::status_save_int_dis)
    fn status_restore(&self, status: Self::Status);

    /// Disable interrupts, discarding the previous state
    fn int_disable(&self);

    /// Returns true if interrupts are globally disabled
    fn is_int_disabled(&self) -> bool;

    /// Set the pending bit of the lowest-priority context switch interrupt
    ///
    /// Setting it again before it fires has no further effect.
    fn pend_context_switch(&self);

    /// Stop in a way a debugger notices
    fn halt(&self) -> !;
}

/// Register-level primitives consumed by the vector trampoline
pub trait StackPort: IntPort {
    /// Return address and mode registers saved at entry
    type ExceptionState;
    /// General-purpose registers not preserved by the calling convention
    type CallerSaved;
    /// Multiply/accumulate result registers
    type Accumulator;

    /// Words occupied on the stack by [`ExceptionState`](Self::ExceptionState)
    const EXCEPTION_STATE_WORDS: usize;
    /// Words occupied on the stack by [`CallerSaved`](Self::CallerSaved)
    const CALLER_SAVED_WORDS: usize;
    /// Words occupied on the stack by [`Accumulator`](Self::Accumulator)
    const ACCUMULATOR_WORDS: usize;

    /// Copy the interrupted code's stack pointer into the current register
    /// bank, in case the hardware switched banks on entry
    fn adopt_interrupted_sp(&self);

    /// Copy the current stack pointer back into the bank the interrupted
    /// code will resume with
    fn publish_sp(&self);

    /// Read the live stack pointer
    fn stack_pointer(&self) -> usize;

    /// Load the live stack pointer
    ///
    /// # Safety
    /// `sp` must point into a stack large enough for everything that runs
    /// until the next load.
    unsafe fn set_stack_pointer(&self, sp: usize);

    /// Priority level of the interrupt being serviced
    fn active_level(&self) -> OsIntLevel;

    /// Enable interrupts above `level`, leaving the rest masked
    fn int_enable_to_level(&self, level: OsIntLevel);

    /// Read the return address and mode state of the exception being serviced
    fn save_exception_state(&self) -> Self::ExceptionState;

    /// Reload the return address and register-bank selection
    fn restore_return_state(&self, state: &Self::ExceptionState);

    /// Reload the status register and return from the exception
    ///
    /// # Safety
    /// Must be the last step of a trampoline whose entry produced `state`.
    unsafe fn exception_return(&self, state: Self::ExceptionState);

    fn save_caller_saved(&self) -> Self::CallerSaved;
    fn restore_caller_saved(&self, regs: Self::CallerSaved);

    fn save_accumulator(&self) -> Self::Accumulator;
    fn restore_accumulator(&self, acc: Self::Accumulator);
}
