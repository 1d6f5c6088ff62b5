//! Interrupt controller state
//!
//! [`IsrContext`] owns the nesting counter and the stack banks. The kernel
//! owns exactly one, [`ISR`], initialized once at start and never torn down.
//! Trampolines are its only writers, always with interrupts disabled.

use crate::core::nesting::NestingCounter;
use crate::core::stack_bank::StackBanks;
use crate::types::OsNestingCtr;

pub struct IsrContext {
    nesting: NestingCounter,
    banks: StackBanks,
}

impl IsrContext {
    pub const fn new() -> Self {
        Self {
            nesting: NestingCounter::new(),
            banks: StackBanks::new(),
        }
    }

    /// Reset nesting and set the top of the interrupt stack
    ///
    /// Call once at kernel start, before interrupts are enabled.
    pub fn init(&self, isr_stack_top: usize) {
        self.nesting.reset();
        self.banks.init(isr_stack_top);
        crate::info!("isr: interrupt stack top {=usize:#x}", isr_stack_top);
    }

    /// Entry step of a trampoline
    ///
    /// Counts the entry and returns the stack pointer the handler must run
    /// on: the interrupt stack on the outermost entry, `live_sp` otherwise.
    #[inline(always)]
    pub fn enter(&self, live_sp: usize) -> usize {
        if self.nesting.on_entry() {
            self.banks.to_interrupt(live_sp)
        } else {
            live_sp
        }
    }

    /// Exit step of a trampoline
    ///
    /// Counts the exit and returns the stack pointer to resume with: the
    /// task stack on the outermost exit, `live_sp` otherwise.
    #[inline(always)]
    pub fn leave(&self, live_sp: usize) -> usize {
        if self.nesting.on_exit() {
            self.banks.to_task(live_sp)
        } else {
            live_sp
        }
    }

    /// Count an entry on cores that bank stacks in hardware
    #[inline(always)]
    pub fn enter_nesting(&self) {
        self.nesting.on_entry();
    }

    /// Count an exit on cores that bank stacks in hardware
    #[inline(always)]
    pub fn leave_nesting(&self) -> bool {
        self.nesting.on_exit()
    }

    #[inline(always)]
    pub fn nesting(&self) -> OsNestingCtr {
        self.nesting.get()
    }

    #[inline(always)]
    pub fn inside_isr(&self) -> bool {
        self.nesting.is_active()
    }

    /// Parked task stack pointer (valid while [`inside_isr`](Self::inside_isr))
    #[inline(always)]
    pub fn task_sp(&self) -> usize {
        self.banks.task_sp()
    }

    /// Parked interrupt stack pointer (valid while not inside an interrupt)
    #[inline(always)]
    pub fn isr_sp(&self) -> usize {
        self.banks.isr_sp()
    }
}

impl Default for IsrContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Global interrupt controller state
pub static ISR: IsrContext = IsrContext::new();

/// Check if currently executing in an interrupt context
#[inline]
pub fn inside_isr() -> bool {
    ISR.inside_isr()
}
