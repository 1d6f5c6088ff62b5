//! Preemption request
//!
//! At every trampoline exit the scheduler's "running" and "next" task
//! markers are compared by identity. If they differ, the low-priority
//! context switch interrupt is pended; its own handler performs the actual
//! register exchange once every higher-priority interrupt has returned.

use core::ptr;

use portable_atomic::{AtomicPtr, Ordering};

use crate::port::IntPort;

/// Read side of the scheduler's task markers
///
/// Markers are opaque here: compared, never dereferenced.
pub trait TaskMarkers {
    type Task;

    /// Task that will resume when the outermost interrupt returns
    fn curr_run_task(&self) -> *const Self::Task;

    /// Task the scheduler selected to run next
    fn next_task_to_run(&self) -> *const Self::Task;
}

/// Scheduler-owned marker pair
///
/// The scheduler updates `next` under its own locking discipline and sets
/// `curr` from the context switch handler.
pub struct RunMarkers<T> {
    curr: AtomicPtr<T>,
    next: AtomicPtr<T>,
}

impl<T> RunMarkers<T> {
    pub const fn new() -> Self {
        Self {
            curr: AtomicPtr::new(ptr::null_mut()),
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    #[inline(always)]
    pub fn set_curr(&self, task: *mut T) {
        self.curr.store(task, Ordering::Release);
    }

    #[inline(always)]
    pub fn set_next(&self, task: *mut T) {
        self.next.store(task, Ordering::Release);
    }

    /// What the context switch handler does once registers are exchanged
    #[inline(always)]
    pub fn commit_switch(&self) {
        self.curr.store(self.next.load(Ordering::Acquire), Ordering::Release);
    }
}

impl<T> Default for RunMarkers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskMarkers for RunMarkers<T> {
    type Task = T;

    #[inline(always)]
    fn curr_run_task(&self) -> *const T {
        self.curr.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn next_task_to_run(&self) -> *const T {
        self.next.load(Ordering::Acquire)
    }
}

/// Returns true if the scheduler wants a different task than the running one
#[inline(always)]
pub fn switch_needed<S: TaskMarkers + ?Sized>(markers: &S) -> bool {
    !ptr::eq(markers.curr_run_task(), markers.next_task_to_run())
}

/// Pend the context switch interrupt if the scheduler's choice changed
///
/// Returns whether the signal was (re)asserted.
#[inline(always)]
pub fn request_switch_if_needed<P, S>(port: &P, markers: &S) -> bool
where
    P: IntPort + ?Sized,
    S: TaskMarkers + ?Sized,
{
    if switch_needed(markers) {
        port.pend_context_switch();
        true
    } else {
        false
    }
}
