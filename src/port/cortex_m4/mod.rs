//! Cortex-M4 port implementation
//!
//! On this core the hardware performs most of the trampoline itself:
//! exception entry stacks the caller-saved registers, handler mode always
//! runs on MSP (the interrupt stack) while tasks run on PSP, and the NVIC
//! handles nesting by priority. What is left to software is the nesting
//! count and the preemption request, done by [`irq_enter`] and [`irq_exit`].
//! PendSV serves as the pending context switch signal.

use cortex_m::interrupt;
use cortex_m::peripheral::scb::{SystemHandler, VectActive};
use cortex_m::peripheral::SCB;
use cortex_m::register::primask;

use super::IntPort;
use crate::core::isr::ISR;
use crate::core::preempt::TaskMarkers;
use crate::core::trampoline::{self, Vector};

/// Lowest priority, used for PendSV
const PENDSV_PRIO: u8 = 0xF0;

/// Cortex-M status: PRIMASK
pub struct CortexM;

/// Global port instance
pub static PORT: CortexM = CortexM;

impl IntPort for CortexM {
    /// True if interrupts were enabled
    type Status = bool;

    #[inline(always)]
    fn status_save_int_dis(&self) -> bool {
        let was_active = primask::read().is_active();
        interrupt::disable();
        was_active
    }

    #[inline(always)]
    fn status_restore(&self, was_active: bool) {
        if was_active {
            unsafe { interrupt::enable() }
        }
    }

    #[inline(always)]
    fn int_disable(&self) {
        interrupt::disable();
    }

    #[inline(always)]
    fn is_int_disabled(&self) -> bool {
        primask::read().is_inactive()
    }

    #[inline(always)]
    fn pend_context_switch(&self) {
        SCB::set_pendsv();
    }

    fn halt(&self) -> ! {
        cortex_m::asm::bkpt();
        loop {
            cortex_m::asm::udf();
        }
    }
}

/// Set PendSV to the lowest priority
///
/// Call once at kernel start, before the first task runs.
pub fn os_cpu_int_init() {
    let mut scb = unsafe { cortex_m::Peripherals::steal().SCB };
    unsafe { scb.set_priority(SystemHandler::PendSV, PENDSV_PRIO) };
}

/// True while the core runs an exception handler (VECTACTIVE != 0)
#[inline]
pub fn is_handler_mode() -> bool {
    SCB::vect_active() != VectActive::ThreadMode
}

/// First call of every kernel-aware interrupt handler
#[inline(always)]
pub fn irq_enter() {
    debug_assert!(is_handler_mode(), "irq_enter outside an exception handler");
    trampoline::stacked_enter(&ISR, &PORT);
}

/// Last call of every kernel-aware interrupt handler
///
/// Pends PendSV if the handler changed the scheduler's choice.
#[inline(always)]
pub fn irq_exit<S: TaskMarkers + ?Sized>(markers: &S) {
    trampoline::stacked_exit(&ISR, &PORT, markers);
}

/// Run `body` between [`irq_enter`] and [`irq_exit`]
#[inline(always)]
pub fn isr<S: TaskMarkers + ?Sized, R>(markers: &S, body: impl FnOnce() -> R) -> R {
    debug_assert!(is_handler_mode(), "isr outside an exception handler");
    trampoline::dispatch_stacked(&ISR, &PORT, markers, body)
}

/// Run a vector declared with `soft_isr!` or `srs_isr!`
///
/// ```ignore
/// #[interrupt]
/// fn TIM2() {
///     cortex_m4::fire(&TIMER_1, &MARKERS);
/// }
/// ```
#[inline(always)]
pub fn fire<V, S: TaskMarkers + ?Sized>(vector: &Vector<V>, markers: &S) {
    debug_assert!(is_handler_mode(), "vector fired outside an exception handler");
    vector.fire_stacked(&ISR, &PORT, markers);
}
