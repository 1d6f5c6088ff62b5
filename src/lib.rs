//! Interrupt and context-switch substrate for a preemptive RTOS kernel
//!
//! This crate sits between raw hardware interrupt vectors and the portable
//! scheduler:
//! - Critical sections that save and restore the global interrupt state
//! - Interrupt nesting tracking and the task/interrupt stack swap
//! - Vector trampolines with software or shadow-register context saving
//! - Raising the pending context switch when the scheduler changed its mind

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod port;

// ============ Re-exports ============

pub use crate::core::config;
pub use crate::core::config::*;
pub use crate::core::critical;
pub use crate::core::error;
pub use crate::core::error::{OsError, OsResult};
pub use crate::core::fatal::fatal_error;
pub use crate::core::isr;
pub use crate::core::isr::{inside_isr, IsrContext, ISR};
pub use crate::core::nesting;
pub use crate::core::preempt;
pub use crate::core::preempt::{RunMarkers, TaskMarkers};
pub use crate::core::stack;
pub use crate::core::stack_bank;
pub use crate::core::trampoline;
pub use crate::core::trampoline::{dispatch, dispatch_stacked, ContextSave, ShadowSave, SoftSave, Vector};
pub use crate::core::types;
pub use crate::core::types::*;
