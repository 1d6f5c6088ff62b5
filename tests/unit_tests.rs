//! Trampoline scenarios on the simulated core
//!
//! These tests run on the host (not embedded target) and drive complete
//! interrupt entries and exits through `SimCpu`, checking the stack swap,
//! nesting, register preservation and preemption signalling.

#[cfg(all(test, not(target_arch = "arm")))]
mod common {
    use rtos_isr::port::sim::{reg, SimCpu};
    use rtos_isr::{IsrContext, RunMarkers};

    pub const TASK_SP: u32 = 0xA001_0F00;
    pub const ISR_TOP: usize = 0xA000_8000;

    pub const LOW_LEVEL: u8 = 2;
    pub const HIGH_LEVEL: u8 = 5;
    pub const SHADOW_LEVEL: u8 = 7;

    pub const TIMER_VECTOR: u8 = 4;
    pub const UART_VECTOR: u8 = 24;

    pub fn setup() -> (SimCpu, IsrContext) {
        let cpu = SimCpu::new();
        cpu.set_reg(reg::SP, TASK_SP);
        cpu.fill_registers(0x1357);
        cpu.set_shadow_level(Some(SHADOW_LEVEL));

        let ctx = IsrContext::new();
        ctx.init(ISR_TOP);
        (cpu, ctx)
    }

    /// Two distinct task identities, `first` running and selected
    pub struct Tasks {
        pub first: *mut u32,
        pub second: *mut u32,
        pub markers: RunMarkers<u32>,
        _storage: Box<[u32; 2]>,
    }

    pub fn tasks() -> Tasks {
        let mut storage = Box::new([0u32; 2]);
        let first: *mut u32 = &mut storage[0];
        let second: *mut u32 = &mut storage[1];
        let markers = RunMarkers::new();
        markers.set_curr(first);
        markers.set_next(first);
        Tasks {
            first,
            second,
            markers,
            _storage: storage,
        }
    }
}

#[cfg(all(test, not(target_arch = "arm")))]
mod critical_tests {
    use rtos_isr::critical::{enter_from_isr_with, enter_with, exit_from_isr_with, exit_with};
    use rtos_isr::port::sim::SimCpu;
    use rtos_isr::port::{IntPort, StackPort};

    #[test]
    fn test_round_trip_from_enabled() {
        let cpu = SimCpu::new();
        cpu.int_enable_to_level(3);
        let before = cpu.status();
        assert!(!cpu.is_int_disabled());

        let st = enter_with(&cpu);
        assert!(cpu.is_int_disabled());
        exit_with(&cpu, st);

        assert_eq!(cpu.status(), before);
    }

    #[test]
    fn test_round_trip_from_disabled() {
        let cpu = SimCpu::new();
        cpu.int_enable_to_level(4);
        cpu.int_disable();
        let before = cpu.status();

        let st = enter_with(&cpu);
        assert!(cpu.is_int_disabled());
        exit_with(&cpu, st);

        assert_eq!(cpu.status(), before);
        assert!(cpu.is_int_disabled());
    }

    #[test]
    fn test_isr_variant_matches_task_variant() {
        let a = SimCpu::new();
        let b = SimCpu::new();

        let sa = enter_with(&a);
        let sb = enter_from_isr_with(&b);
        assert_eq!(sa, sb);
        assert_eq!(a.status(), b.status());

        exit_with(&a, sa);
        exit_from_isr_with(&b, sb);
        assert_eq!(a.status(), b.status());
    }

    #[test]
    fn test_nested_exit_keeps_disabled() {
        let cpu = SimCpu::new();
        let outer = enter_with(&cpu);
        let inner = enter_with(&cpu);
        exit_with(&cpu, inner);
        assert!(cpu.is_int_disabled());
        exit_with(&cpu, outer);
        assert!(!cpu.is_int_disabled());
    }
}

#[cfg(all(test, not(target_arch = "arm")))]
mod trampoline_tests {
    use super::common::*;
    use rtos_isr::port::sim::{reg, SimCpu, SimSnapshot};
    use rtos_isr::port::{IntPort, StackPort};
    use rtos_isr::{ContextSave, IsrContext, ShadowSave, SoftSave};

    #[test]
    fn test_noop_handler_resumes_task_unchanged() {
        let (cpu, ctx) = setup();
        let t = tasks();
        let before = cpu.snapshot();

        assert!(cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {}));

        assert_eq!(cpu.snapshot(), before);
        assert_eq!(cpu.reg(reg::SP), TASK_SP);
        assert_eq!(ctx.nesting(), 0);
        assert!(!cpu.is_int_disabled());
        assert!(!cpu.switch_pending());
    }

    #[test]
    fn test_handler_runs_on_interrupt_stack() {
        let (cpu, ctx) = setup();
        let t = tasks();
        let frame = <SoftSave as ContextSave<SimCpu>>::FRAME_BYTES;

        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {
            assert_eq!(ctx.nesting(), 1);
            assert!(ctx.inside_isr());
            assert_eq!(ctx.task_sp(), TASK_SP as usize);
            assert_eq!(cpu.stack_pointer(), ISR_TOP - frame);
        });

        assert_eq!(cpu.stack_pointer(), TASK_SP as usize);
        assert_eq!(ctx.isr_sp(), ISR_TOP);
    }

    #[test]
    fn test_handler_runs_with_nesting_enabled_above_own_level() {
        let (cpu, ctx) = setup();
        let t = tasks();

        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {
            assert!(!cpu.is_int_disabled());
            assert_eq!(cpu.int_level(), LOW_LEVEL);
            // same or lower priority never preempts
            assert!(!cpu.accept(LOW_LEVEL, TIMER_VECTOR + 1));
            assert!(!cpu.accept(LOW_LEVEL - 1, TIMER_VECTOR + 2));
        });

        assert_eq!(cpu.int_level(), 0);
    }

    #[test]
    fn test_nested_interrupt_swaps_only_at_outermost() {
        let (cpu, ctx) = setup();
        let t = tasks();
        let frame = <SoftSave as ContextSave<SimCpu>>::FRAME_BYTES;

        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {
            let sp_a = cpu.stack_pointer();
            assert_eq!(sp_a, ISR_TOP - frame);

            let fired = cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, HIGH_LEVEL, TIMER_VECTOR + 1, || {
                assert_eq!(ctx.nesting(), 2);
                // still on the interrupt stack, just one frame deeper
                assert_eq!(cpu.stack_pointer(), sp_a - frame);
                assert_eq!(ctx.task_sp(), TASK_SP as usize);
            });
            assert!(fired);

            assert_eq!(ctx.nesting(), 1);
            assert_eq!(cpu.stack_pointer(), sp_a);
            assert_eq!(ctx.task_sp(), TASK_SP as usize);
        });

        assert_eq!(ctx.nesting(), 0);
        assert_eq!(cpu.stack_pointer(), TASK_SP as usize);
        assert_eq!(cpu.stack_low_watermark() as usize, ISR_TOP - 2 * frame);
    }

    #[test]
    fn test_stack_pointer_tracks_nesting_through_deep_sequence() {
        let (cpu, ctx) = setup();
        let t = tasks();

        fn nest(cpu: &SimCpu, ctx: &IsrContext, t: &Tasks, level: u8) {
            assert!(ctx.nesting() > 0);
            assert_ne!(cpu.stack_pointer(), TASK_SP as usize);
            assert!(cpu.stack_pointer() < ISR_TOP);
            if level < 6 {
                let depth = ctx.nesting();
                cpu.interrupt::<SoftSave, _, _>(ctx, &t.markers, level + 1, level, || {
                    assert_eq!(ctx.nesting(), depth + 1);
                    nest(cpu, ctx, t, level + 1);
                });
                assert_eq!(ctx.nesting(), depth);
            }
        }

        for _ in 0..3 {
            cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, 1, 1, || nest(&cpu, &ctx, &t, 1));
            assert_eq!(ctx.nesting(), 0);
            assert_eq!(cpu.stack_pointer(), TASK_SP as usize);
            assert_eq!(ctx.isr_sp(), ISR_TOP);
        }
    }

    #[test]
    fn test_handler_clobbers_are_undone() {
        let (cpu, ctx) = setup();
        let t = tasks();
        let before = cpu.snapshot();

        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {
            cpu.clobber_caller_saved(0xDEAD_0000);
        });

        assert_eq!(cpu.snapshot(), before);
    }

    fn run_variant<V: ContextSave<SimCpu>>(shadow_bank: bool) -> (SimSnapshot, u8, bool) {
        let (cpu, ctx) = setup();
        let t = tasks();
        if !shadow_bank {
            cpu.set_shadow_level(None);
        }
        let mut seen_level = 0;
        let mut seen_disabled = true;

        cpu.interrupt::<V, _, _>(&ctx, &t.markers, SHADOW_LEVEL, UART_VECTOR, || {
            seen_level = cpu.int_level();
            seen_disabled = cpu.is_int_disabled();
            cpu.clobber_caller_saved(0x5A5A_0000);
        });

        (cpu.snapshot(), seen_level, seen_disabled)
    }

    #[test]
    fn test_variants_are_indistinguishable() {
        let (soft, soft_level, soft_disabled) = run_variant::<SoftSave>(false);
        let (shadow, shadow_level, shadow_disabled) = run_variant::<ShadowSave>(true);

        assert_eq!(soft, shadow);
        assert_eq!(soft_level, shadow_level);
        assert_eq!(soft_level, SHADOW_LEVEL);
        assert!(!soft_disabled);
        assert!(!shadow_disabled);
    }

    #[test]
    fn test_shadow_variant_uses_shadow_bank() {
        let (cpu, ctx) = setup();
        let t = tasks();
        let task_bank = cpu.snapshot();
        let frame = <ShadowSave as ContextSave<SimCpu>>::FRAME_BYTES;

        cpu.interrupt::<ShadowSave, _, _>(&ctx, &t.markers, SHADOW_LEVEL, UART_VECTOR, || {
            assert_eq!(cpu.current_set(), 1);
            assert_eq!(cpu.stack_pointer(), ISR_TOP - frame);
            assert_eq!(cpu.reg_in(0, reg::SP), TASK_SP);
            cpu.clobber_caller_saved(0x0BAD_0000);
            assert_eq!(cpu.reg_in(0, reg::T0), task_bank.gpr[reg::T0]);
        });

        assert_eq!(cpu.current_set(), 0);
        assert_eq!(cpu.snapshot(), task_bank);
    }

    #[test]
    fn test_shadow_vector_nested_in_soft_vector() {
        let (cpu, ctx) = setup();
        let t = tasks();

        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {
            cpu.fill_registers(0x2468);
            let inside = cpu.snapshot();

            cpu.interrupt::<ShadowSave, _, _>(&ctx, &t.markers, SHADOW_LEVEL, UART_VECTOR, || {
                assert_eq!(ctx.nesting(), 2);
                cpu.clobber_caller_saved(0x7777_0000);
            });

            assert_eq!(cpu.snapshot(), inside);
        });

        assert_eq!(ctx.nesting(), 0);
        assert_eq!(cpu.stack_pointer(), TASK_SP as usize);
    }
}

#[cfg(all(test, not(target_arch = "arm")))]
mod preempt_tests {
    use super::common::*;
    use rtos_isr::{ShadowSave, SoftSave};

    #[test]
    fn test_no_switch_when_markers_equal() {
        let (cpu, ctx) = setup();
        let t = tasks();

        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {});
        cpu.interrupt::<ShadowSave, _, _>(&ctx, &t.markers, SHADOW_LEVEL, UART_VECTOR, || {});

        assert_eq!(cpu.pend_requests(), 0);
        assert!(!cpu.switch_pending());
    }

    #[test]
    fn test_switch_raised_once_per_stale_exit() {
        let (cpu, ctx) = setup();
        let t = tasks();

        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {
            t.markers.set_next(t.second);
        });
        assert!(cpu.switch_pending());
        assert_eq!(cpu.pend_requests(), 1);

        // not yet taken: the next exit asserts it again, harmlessly
        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {});
        assert!(cpu.switch_pending());
        assert_eq!(cpu.pend_requests(), 2);

        // switch handler ran
        cpu.clear_switch_pending();
        t.markers.commit_switch();
        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {});
        assert!(!cpu.switch_pending());
        assert_eq!(cpu.pend_requests(), 2);
    }

    #[test]
    fn test_switch_raised_at_nested_exit() {
        let (cpu, ctx) = setup();
        let t = tasks();

        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {
            cpu.interrupt::<ShadowSave, _, _>(&ctx, &t.markers, SHADOW_LEVEL, UART_VECTOR, || {
                t.markers.set_next(t.second);
            });
            // raised by the inner trampoline, while still nested
            assert_eq!(ctx.nesting(), 1);
            assert!(cpu.switch_pending());
        });

        assert!(cpu.switch_pending());
        assert_eq!(cpu.pend_requests(), 2);
    }

    #[test]
    fn test_switch_cancelled_before_taken() {
        let (cpu, ctx) = setup();
        let t = tasks();

        cpu.interrupt::<SoftSave, _, _>(&ctx, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {
            t.markers.set_next(t.second);
            t.markers.set_next(t.first);
        });

        assert!(!cpu.switch_pending());
    }
}

#[cfg(all(test, not(target_arch = "arm")))]
mod vector_tests {
    use super::common::*;
    use core::sync::atomic::{AtomicU32, Ordering};
    use rtos_isr::port::sim::reg;

    static TIMER_HITS: AtomicU32 = AtomicU32::new(0);
    static UART_HITS: AtomicU32 = AtomicU32::new(0);

    rtos_isr::soft_isr!(TIMER_ISR, TIMER_VECTOR, {
        TIMER_HITS.fetch_add(1, Ordering::Relaxed);
    });

    rtos_isr::srs_isr!(UART_ISR, UART_VECTOR, {
        UART_HITS.fetch_add(1, Ordering::Relaxed);
    });

    #[test]
    fn test_registered_vectors_fire() {
        let (cpu, ctx) = setup();
        let t = tasks();
        let before = cpu.snapshot();

        assert_eq!(TIMER_ISR.number(), TIMER_VECTOR);
        assert!(cpu.fire(&TIMER_ISR, &ctx, &t.markers, LOW_LEVEL));
        assert!(cpu.fire(&UART_ISR, &ctx, &t.markers, SHADOW_LEVEL));

        assert_eq!(TIMER_HITS.load(Ordering::Relaxed), 1);
        assert_eq!(UART_HITS.load(Ordering::Relaxed), 1);
        assert_eq!(cpu.snapshot(), before);
        assert_eq!(cpu.reg(reg::SP), TASK_SP);
    }

    #[test]
    fn test_masked_vector_does_not_run() {
        use rtos_isr::port::IntPort;

        let (cpu, ctx) = setup();
        let t = tasks();
        cpu.int_disable();

        static MASKED_HITS: AtomicU32 = AtomicU32::new(0);
        rtos_isr::soft_isr!(MASKED_ISR, 9, {
            MASKED_HITS.fetch_add(1, Ordering::Relaxed);
        });

        assert!(!cpu.fire(&MASKED_ISR, &ctx, &t.markers, HIGH_LEVEL));
        assert_eq!(MASKED_HITS.load(Ordering::Relaxed), 0);
        assert_eq!(ctx.nesting(), 0);
    }
}

#[cfg(all(test, not(target_arch = "arm")))]
mod context_tests {
    use super::common::*;
    use core::cell::Cell;
    use rtos_isr::error::{check_int_context, check_non_int_context};
    use rtos_isr::{inside_isr, OsError, SoftSave, ISR};

    #[test]
    fn test_context_checks_follow_global_nesting() {
        let (cpu, _) = setup();
        let t = tasks();
        ISR.init(ISR_TOP);

        let seen = Cell::new(None);
        let ran = cpu.interrupt::<SoftSave, _, _>(&ISR, &t.markers, LOW_LEVEL, TIMER_VECTOR, || {
            seen.set(Some((inside_isr(), check_int_context(), check_non_int_context())));
        });

        assert!(ran);
        assert_eq!(seen.get(), Some((true, Ok(()), Err(OsError::WContext))));

        assert!(!inside_isr());
        assert_eq!(check_int_context(), Err(OsError::WContext));
        assert_eq!(check_non_int_context(), Ok(()));
    }
}

#[cfg(test)]
mod config_tests {
    use rtos_isr::config::*;
    use rtos_isr::stack::{stack_unused, Stack};

    #[test]
    fn test_config_values() {
        assert_eq!(CFG_PRIORITIES_CNT, CFG_INT_WIDTH);
        assert_eq!(CFG_WAIT_INFINITE, u32::MAX);
        assert!(CFG_ISR_STK_SIZE >= CFG_STK_SIZE_MIN);
        assert!(CFG_SWITCH_CONTEXT_LEVEL < CFG_INT_LEVEL_MAX);
    }

    #[test]
    fn test_interrupt_stack_storage() {
        let stk: Box<Stack<CFG_ISR_STK_SIZE>> = Box::new(Stack::new());
        assert_eq!(stk.len(), CFG_ISR_STK_SIZE);
        assert_eq!(stk.top() % CFG_STK_ALIGN, 0);
        assert_eq!(stack_unused(stk.as_slice()), CFG_ISR_STK_SIZE);
    }
}
