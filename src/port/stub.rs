//! Stub interrupt port for non-ARM targets
//!
//! Keeps the global enable bit in an atomic so the free-standing critical
//! section functions behave the same way on the host as on target.

use portable_atomic::{AtomicBool, Ordering};

use super::IntPort;

/// Host stand-in for the processor status register
pub struct Stub {
    int_enabled: AtomicBool,
    switch_pending: AtomicBool,
}

impl Stub {
    pub const fn new() -> Self {
        Self {
            int_enabled: AtomicBool::new(true),
            switch_pending: AtomicBool::new(false),
        }
    }

    /// Returns true if a context switch was requested and not yet taken
    pub fn switch_pending(&self) -> bool {
        self.switch_pending.load(Ordering::Acquire)
    }

    /// Consume the pending switch request
    pub fn take_switch_pending(&self) -> bool {
        self.switch_pending.swap(false, Ordering::AcqRel)
    }
}

impl Default for Stub {
    fn default() -> Self {
        Self::new()
    }
}

/// Global stub port instance
pub static PORT: Stub = Stub::new();

impl IntPort for Stub {
    type Status = bool;

    #[inline]
    fn status_save_int_dis(&self) -> bool {
        self.int_enabled.swap(false, Ordering::AcqRel)
    }

    #[inline]
    fn status_restore(&self, was_enabled: bool) {
        self.int_enabled.store(was_enabled, Ordering::Release);
    }

    #[inline]
    fn int_disable(&self) {
        self.int_enabled.store(false, Ordering::Release);
    }

    #[inline]
    fn is_int_disabled(&self) -> bool {
        !self.int_enabled.load(Ordering::Acquire)
    }

    #[inline]
    fn pend_context_switch(&self) {
        self.switch_pending.store(true, Ordering::Release);
    }

    fn halt(&self) -> ! {
        panic!("kernel halted");
    }
}
