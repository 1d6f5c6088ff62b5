//! Task / interrupt stack pointer slots
//!
//! Holds the parked stack pointer of whichever stack is not live. The task
//! slot is meaningful only while no interrupt is active, the interrupt slot
//! only while one is. Swaps happen exclusively at nesting transitions
//! 0 → 1 and 1 → 0; nested interrupts keep running on the interrupt stack.

use portable_atomic::{AtomicUsize, Ordering};

pub struct StackBanks {
    task_sp: AtomicUsize,
    isr_sp: AtomicUsize,
}

impl StackBanks {
    pub const fn new() -> Self {
        Self {
            task_sp: AtomicUsize::new(0),
            isr_sp: AtomicUsize::new(0),
        }
    }

    /// Set the top of the interrupt stack, before the first interrupt
    pub fn init(&self, isr_stack_top: usize) {
        self.task_sp.store(0, Ordering::Relaxed);
        self.isr_sp.store(isr_stack_top, Ordering::Relaxed);
    }

    /// Park the task stack pointer and return the one to load
    #[inline(always)]
    pub fn to_interrupt(&self, live_sp: usize) -> usize {
        self.task_sp.store(live_sp, Ordering::Relaxed);
        self.isr_sp.load(Ordering::Relaxed)
    }

    /// Park the interrupt stack pointer and return the task's
    #[inline(always)]
    pub fn to_task(&self, live_sp: usize) -> usize {
        self.isr_sp.store(live_sp, Ordering::Relaxed);
        self.task_sp.load(Ordering::Relaxed)
    }

    /// Stack pointer of the interrupted task
    #[inline(always)]
    pub fn task_sp(&self) -> usize {
        self.task_sp.load(Ordering::Relaxed)
    }

    /// Parked interrupt stack pointer
    #[inline(always)]
    pub fn isr_sp(&self) -> usize {
        self.isr_sp.load(Ordering::Relaxed)
    }
}

impl Default for StackBanks {
    fn default() -> Self {
        Self::new()
    }
}
