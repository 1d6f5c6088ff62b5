//! Vector trampolines
//!
//! A trampoline is the fixed sequence wrapped around every handler body:
//!
//! 1. Normalization: make the interrupted stack pointer visible in the
//!    register bank the hardware selected for this vector
//! 2. Entry: count the nesting level; the outermost entry moves onto the
//!    interrupt stack
//! 3. Save, dispatch, restore: save what the calling convention does not,
//!    re-enable interrupts above this vector's level, run the body, disable
//!    interrupts again and restore
//! 4. Preemption check and exit: pend the context switch if the scheduler
//!    changed its mind, count the exit (the outermost one moves back to the
//!    task stack) and return from the exception
//!
//! The two variants differ only in step 3's save set, chosen at build time
//! through the [`ContextSave`] type parameter:
//! - [`SoftSave`]: the full caller-saved register set, for vectors running
//!   on the same register bank as the interrupted code
//! - [`ShadowSave`]: only the multiply/accumulate pair, for vectors the
//!   hardware routes to a shadow register set
//!
//! Handler bodies see no difference between the two.
//!
//! Cores whose exception entry already stacks the caller-saved registers and
//! moves onto the interrupt stack (Cortex-M) skip steps 1 and 3 and most of
//! 2 and 4; [`dispatch_stacked`] keeps only the nesting count and the
//! preemption check.

use core::marker::PhantomData;

use crate::core::isr::IsrContext;
use crate::core::preempt::{self, TaskMarkers};
use crate::port::{IntPort, StackPort};
use crate::types::{OsVectorNum, OsWord};

/// Register save set of a trampoline variant
pub trait ContextSave<P: StackPort> {
    /// Saved registers, kept on the interrupt stack while the body runs
    type Saved;

    /// Frame size pushed by the trampoline, in words
    const FRAME_WORDS: usize;

    /// Frame size in bytes
    const FRAME_BYTES: usize = Self::FRAME_WORDS * core::mem::size_of::<OsWord>();

    fn save(port: &P) -> Self::Saved;
    fn restore(port: &P, saved: Self::Saved);
}

/// Software context saving
pub struct SoftSave;

/// Shadow register set context saving
pub struct ShadowSave;

impl<P: StackPort> ContextSave<P> for SoftSave {
    type Saved = (P::CallerSaved, P::Accumulator);

    const FRAME_WORDS: usize =
        P::EXCEPTION_STATE_WORDS + P::CALLER_SAVED_WORDS + P::ACCUMULATOR_WORDS;

    #[inline(always)]
    fn save(port: &P) -> Self::Saved {
        let acc = port.save_accumulator();
        (port.save_caller_saved(), acc)
    }

    #[inline(always)]
    fn restore(port: &P, (regs, acc): Self::Saved) {
        port.restore_accumulator(acc);
        port.restore_caller_saved(regs);
    }
}

impl<P: StackPort> ContextSave<P> for ShadowSave {
    type Saved = P::Accumulator;

    const FRAME_WORDS: usize = P::EXCEPTION_STATE_WORDS + P::ACCUMULATOR_WORDS;

    #[inline(always)]
    fn save(port: &P) -> Self::Saved {
        port.save_accumulator()
    }

    #[inline(always)]
    fn restore(port: &P, acc: Self::Saved) {
        port.restore_accumulator(acc);
    }
}

/// Run `body` as the handler of the interrupt the hardware just accepted
///
/// Ordering guarantees:
/// - every register is saved before interrupts are re-enabled
/// - the preemption check runs after `body` and before the nesting level
///   drops back
/// - the stack pointer is swapped only on the outermost entry and exit
///
/// # Safety
/// Must be the first thing that runs after the hardware accepted an
/// interrupt, with interrupts still disabled, and `ctx` must have been
/// initialized with a valid interrupt stack. For [`ShadowSave`] the vector
/// must actually be routed to a shadow register set.
pub unsafe fn dispatch<P, V, S, F>(ctx: &IsrContext, port: &P, markers: &S, body: F)
where
    P: StackPort,
    V: ContextSave<P>,
    S: TaskMarkers + ?Sized,
    F: FnOnce(),
{
    // Normalization
    port.adopt_interrupted_sp();

    // Entry
    let sp = ctx.enter(port.stack_pointer());
    unsafe { port.set_stack_pointer(sp - V::FRAME_BYTES) };

    // Save, dispatch, restore
    let mode = port.save_exception_state();
    let saved = V::save(port);

    port.int_enable_to_level(port.active_level());
    body();
    port.int_disable();

    V::restore(port, saved);

    // Preemption check and exit
    preempt::request_switch_if_needed(port, markers);

    port.restore_return_state(&mode);
    let sp = ctx.leave(port.stack_pointer() + V::FRAME_BYTES);
    unsafe { port.set_stack_pointer(sp) };
    port.publish_sp();

    unsafe { port.exception_return(mode) };
}

/// Entry half of [`dispatch_stacked`]
#[inline(always)]
pub fn stacked_enter<P: IntPort + ?Sized>(ctx: &IsrContext, port: &P) {
    let st = port.status_save_int_dis();
    ctx.enter_nesting();
    port.status_restore(st);
}

/// Exit half of [`dispatch_stacked`]
#[inline(always)]
pub fn stacked_exit<P, S>(ctx: &IsrContext, port: &P, markers: &S)
where
    P: IntPort + ?Sized,
    S: TaskMarkers + ?Sized,
{
    let st = port.status_save_int_dis();
    preempt::request_switch_if_needed(port, markers);
    ctx.leave_nesting();
    port.status_restore(st);
}

/// Run `body` on a core that saves context and banks stacks in hardware
///
/// Counts the nesting level around the body and pends the context switch
/// on the way out if the scheduler changed its mind. Safe to call from any
/// handler priority, the count is updated with interrupts disabled.
#[inline(always)]
pub fn dispatch_stacked<P, S, R>(ctx: &IsrContext, port: &P, markers: &S, body: impl FnOnce() -> R) -> R
where
    P: IntPort + ?Sized,
    S: TaskMarkers + ?Sized,
{
    stacked_enter(ctx, port);
    let r = body();
    stacked_exit(ctx, port, markers);
    r
}

/// Binding of a vector number to a trampoline variant and a handler body
pub struct Vector<V> {
    number: OsVectorNum,
    handler: fn(),
    _variant: PhantomData<V>,
}

impl<V> Vector<V> {
    #[inline(always)]
    pub const fn number(&self) -> OsVectorNum {
        self.number
    }

    #[inline(always)]
    pub fn handler(&self) -> fn() {
        self.handler
    }

    /// Run the handler through this vector's trampoline
    ///
    /// # Safety
    /// Same contract as [`dispatch`].
    #[inline(always)]
    pub unsafe fn fire<P, S>(&self, ctx: &IsrContext, port: &P, markers: &S)
    where
        P: StackPort,
        V: ContextSave<P>,
        S: TaskMarkers + ?Sized,
    {
        unsafe { dispatch::<P, V, S, _>(ctx, port, markers, self.handler) }
    }

    /// Run the handler on a core that saves context in hardware
    ///
    /// The variant is irrelevant there: the hardware frame is the same for
    /// every vector.
    #[inline(always)]
    pub fn fire_stacked<P, S>(&self, ctx: &IsrContext, port: &P, markers: &S)
    where
        P: IntPort + ?Sized,
        S: TaskMarkers + ?Sized,
    {
        dispatch_stacked(ctx, port, markers, self.handler)
    }
}

impl Vector<SoftSave> {
    /// Vector whose trampoline saves the full caller-saved set
    pub const fn soft(number: OsVectorNum, handler: fn()) -> Self {
        Self {
            number,
            handler,
            _variant: PhantomData,
        }
    }
}

impl Vector<ShadowSave> {
    /// Vector served from a shadow register set
    pub const fn shadow(number: OsVectorNum, handler: fn()) -> Self {
        Self {
            number,
            handler,
            _variant: PhantomData,
        }
    }
}

/// Declare a vector whose trampoline saves context in software
///
/// On ports with a software trampoline the vector runs through
/// [`Vector::fire`]. On Cortex-M no port provides one; call
/// [`Vector::fire_stacked`] from the device interrupt handler instead.
///
/// ```ignore
/// soft_isr!(TIMER_1, 4, {
///     clear_timer_flag();
/// });
/// ```
#[macro_export]
macro_rules! soft_isr {
    ($name:ident, $vector:expr, $body:block) => {
        pub static $name: $crate::trampoline::Vector<$crate::trampoline::SoftSave> =
            $crate::trampoline::Vector::soft($vector, {
                fn body() $body
                body
            });
    };
}

/// Declare a vector served from a shadow register set
///
/// Same firing rules as [`soft_isr!`].
#[macro_export]
macro_rules! srs_isr {
    ($name:ident, $vector:expr, $body:block) => {
        pub static $name: $crate::trampoline::Vector<$crate::trampoline::ShadowSave> =
            $crate::trampoline::Vector::shadow($vector, {
                fn body() $body
                body
            });
    };
}
