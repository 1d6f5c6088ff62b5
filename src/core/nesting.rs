//! Interrupt nesting counter

use portable_atomic::{AtomicU32, Ordering};

use crate::types::OsNestingCtr;

/// Count of interrupt contexts that have been entered and not yet left
///
/// Only trampoline code writes it, and only with interrupts disabled, so the
/// read-modify-write pairs below need no further locking. Relaxed ordering is
/// enough on a single core.
pub struct NestingCounter {
    count: AtomicU32,
}

impl NestingCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Record an interrupt entry
    ///
    /// Returns true on the 0 → 1 transition (outermost entry).
    #[inline(always)]
    pub fn on_entry(&self) -> bool {
        let nesting = self.count.load(Ordering::Relaxed) + 1;
        self.count.store(nesting, Ordering::Relaxed);
        nesting == 1
    }

    /// Record an interrupt exit
    ///
    /// Returns true on the 1 → 0 transition (outermost exit).
    #[inline(always)]
    pub fn on_exit(&self) -> bool {
        let nesting = self.count.load(Ordering::Relaxed);
        debug_assert!(nesting > 0, "interrupt exit without entry");
        let nesting = nesting.wrapping_sub(1);
        self.count.store(nesting, Ordering::Relaxed);
        nesting == 0
    }

    /// Current nesting depth
    #[inline(always)]
    pub fn get(&self) -> OsNestingCtr {
        self.count.load(Ordering::Relaxed)
    }

    /// Returns true while inside at least one interrupt
    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.get() > 0
    }

    pub(crate) fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

impl Default for NestingCounter {
    fn default() -> Self {
        Self::new()
    }
}
