//! Simulated core for host testing
//!
//! Models the parts of a PIC32 (MIPS32 M4K) core the trampolines touch:
//! two general-purpose register banks, the shared `hi`/`lo` pair, the
//! `Status`, `Cause`, `SRSCtl` and `EPC` coprocessor registers, and the core
//! software interrupt flag used as the pending context switch signal.
//!
//! Interrupts are "fired" by the test through [`SimCpu::interrupt`], which
//! performs the hardware acceptance step and then runs the trampoline.

use core::cell::Cell;

use super::{IntPort, StackPort};
use crate::config::CFG_INT_LEVEL_MAX;
use crate::core::isr::IsrContext;
use crate::core::preempt::TaskMarkers;
use crate::core::trampoline::{dispatch, ContextSave, Vector};
use crate::types::{OsIntLevel, OsVectorNum};

pub const NUM_GPR: usize = 32;
pub const NUM_REG_SETS: usize = 2;
pub const NUM_CALLER_SAVED: usize = 18;

/// Register numbers (o32 names)
pub mod reg {
    pub const ZERO: usize = 0;
    pub const AT: usize = 1;
    pub const V0: usize = 2;
    pub const V1: usize = 3;
    pub const A0: usize = 4;
    pub const A1: usize = 5;
    pub const A2: usize = 6;
    pub const A3: usize = 7;
    pub const T0: usize = 8;
    pub const T1: usize = 9;
    pub const T2: usize = 10;
    pub const T3: usize = 11;
    pub const T4: usize = 12;
    pub const T5: usize = 13;
    pub const T6: usize = 14;
    pub const T7: usize = 15;
    pub const S0: usize = 16;
    pub const T8: usize = 24;
    pub const T9: usize = 25;
    pub const K0: usize = 26;
    pub const K1: usize = 27;
    pub const GP: usize = 28;
    pub const SP: usize = 29;
    pub const FP: usize = 30;
    pub const RA: usize = 31;
}

/// Registers a called function may clobber
pub const CALLER_SAVED: [usize; NUM_CALLER_SAVED] = [
    reg::AT,
    reg::V0,
    reg::V1,
    reg::A0,
    reg::A1,
    reg::A2,
    reg::A3,
    reg::T0,
    reg::T1,
    reg::T2,
    reg::T3,
    reg::T4,
    reg::T5,
    reg::T6,
    reg::T7,
    reg::T8,
    reg::T9,
    reg::RA,
];

// Status
const ST_IE: u32 = 1 << 0;
const ST_EXL: u32 = 1 << 1;
/// Bits 1..=15 (EXL, ERL, UM, IM and the low IPL bits)
const ST_NESTED_CLEAR: u32 = 0x7FFF << 1;
const ST_IPL_SHIFT: u32 = 10;
const ST_IPL_MASK: u32 = 0x3F << ST_IPL_SHIFT;

// Cause
const CAUSE_RIPL_SHIFT: u32 = 10;
const CAUSE_RIPL_MASK: u32 = 0x3F << CAUSE_RIPL_SHIFT;

// SRSCtl
const SRS_CSS_MASK: u32 = 0xF;
const SRS_PSS_SHIFT: u32 = 6;
const SRS_PSS_MASK: u32 = 0xF << SRS_PSS_SHIFT;

/// IFS0 bit of core software interrupt 0
const IFS0_CS0: u32 = 1 << 1;

const VECTOR_BASE: u32 = 0x9D00_0200;
const VECTOR_SPACING: u32 = 0x20;

/// Mode registers captured at trampoline entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimExceptionState {
    pub epc: u32,
    pub srsctl: u32,
    pub status: u32,
}

/// Software-saved general-purpose registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimCallerSaved([u32; NUM_CALLER_SAVED]);

/// `hi`/`lo` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimAccumulator {
    pub hi: u32,
    pub lo: u32,
}

/// Everything the interrupted code can observe after a return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSnapshot {
    /// Registers of the current bank, with `k0`/`k1` masked out
    pub gpr: [u32; NUM_GPR],
    pub hi: u32,
    pub lo: u32,
    pub pc: u32,
    pub status: u32,
    pub reg_set: usize,
}

/// Simulated processor
pub struct SimCpu {
    gpr: [Cell<[u32; NUM_GPR]>; NUM_REG_SETS],
    hi: Cell<u32>,
    lo: Cell<u32>,
    pc: Cell<u32>,
    epc: Cell<u32>,
    status: Cell<u32>,
    cause: Cell<u32>,
    srsctl: Cell<u32>,
    ifs0: Cell<u32>,
    /// Interrupt level the hardware maps onto register set 1
    shadow_level: Cell<Option<OsIntLevel>>,
    pend_requests: Cell<u32>,
    sp_low: Cell<u32>,
}

impl SimCpu {
    /// A core running task code on set 0 with interrupts enabled at level 0
    pub const fn new() -> Self {
        Self {
            gpr: [Cell::new([0; NUM_GPR]), Cell::new([0; NUM_GPR])],
            hi: Cell::new(0),
            lo: Cell::new(0),
            pc: Cell::new(0x9D00_1000),
            epc: Cell::new(0),
            status: Cell::new(ST_IE),
            cause: Cell::new(0),
            srsctl: Cell::new(0),
            ifs0: Cell::new(0),
            shadow_level: Cell::new(None),
            pend_requests: Cell::new(0),
            sp_low: Cell::new(u32::MAX),
        }
    }

    // ============ Register access ============

    #[inline]
    pub fn current_set(&self) -> usize {
        (self.srsctl.get() & SRS_CSS_MASK) as usize
    }

    #[inline]
    fn previous_set(&self) -> usize {
        ((self.srsctl.get() & SRS_PSS_MASK) >> SRS_PSS_SHIFT) as usize
    }

    pub fn reg_in(&self, set: usize, r: usize) -> u32 {
        self.gpr[set].get()[r]
    }

    pub fn set_reg_in(&self, set: usize, r: usize, value: u32) {
        if r == reg::ZERO {
            return;
        }
        let mut bank = self.gpr[set].get();
        bank[r] = value;
        self.gpr[set].set(bank);
    }

    /// Read a register of the current bank
    pub fn reg(&self, r: usize) -> u32 {
        self.reg_in(self.current_set(), r)
    }

    /// Write a register of the current bank
    pub fn set_reg(&self, r: usize, value: u32) {
        self.set_reg_in(self.current_set(), r, value);
    }

    pub fn hi(&self) -> u32 {
        self.hi.get()
    }

    pub fn lo(&self) -> u32 {
        self.lo.get()
    }

    pub fn set_hilo(&self, hi: u32, lo: u32) {
        self.hi.set(hi);
        self.lo.set(lo);
    }

    pub fn pc(&self) -> u32 {
        self.pc.get()
    }

    pub fn set_pc(&self, pc: u32) {
        self.pc.set(pc);
    }

    pub fn status(&self) -> u32 {
        self.status.get()
    }

    /// Current interrupt priority level (`Status.IPL`)
    pub fn int_level(&self) -> OsIntLevel {
        ((self.status.get() & ST_IPL_MASK) >> ST_IPL_SHIFT) as OsIntLevel
    }

    /// Route interrupts of `level` onto the shadow register set
    pub fn set_shadow_level(&self, level: Option<OsIntLevel>) {
        self.shadow_level.set(level);
    }

    /// Give every register of the current bank (and `hi`/`lo`) a distinct
    /// value derived from `seed`, keeping `sp`
    pub fn fill_registers(&self, seed: u32) {
        for r in 1..NUM_GPR {
            if r == reg::SP || r == reg::K0 || r == reg::K1 {
                continue;
            }
            self.set_reg(r, seed.wrapping_mul(0x0101_0101).wrapping_add(r as u32));
        }
        self.set_hilo(seed ^ 0xAAAA_0000, seed ^ 0x0000_5555);
    }

    /// Overwrite what a compiled handler body is allowed to overwrite
    pub fn clobber_caller_saved(&self, junk: u32) {
        for &r in CALLER_SAVED.iter() {
            self.set_reg(r, junk ^ r as u32);
        }
        self.set_hilo(!junk, junk.rotate_left(7));
    }

    pub fn snapshot(&self) -> SimSnapshot {
        let mut gpr = self.gpr[self.current_set()].get();
        gpr[reg::K0] = 0;
        gpr[reg::K1] = 0;
        SimSnapshot {
            gpr,
            hi: self.hi.get(),
            lo: self.lo.get(),
            pc: self.pc.get(),
            status: self.status.get(),
            reg_set: self.current_set(),
        }
    }

    // ============ Pending switch signal ============

    pub fn switch_pending(&self) -> bool {
        self.ifs0.get() & IFS0_CS0 != 0
    }

    /// What the context switch handler does before swapping tasks
    pub fn clear_switch_pending(&self) {
        self.ifs0.set(self.ifs0.get() & !IFS0_CS0);
    }

    /// Number of times the pending bit was written
    pub fn pend_requests(&self) -> u32 {
        self.pend_requests.get()
    }

    /// Lowest stack pointer loaded since the last reset
    pub fn stack_low_watermark(&self) -> u32 {
        self.sp_low.get()
    }

    pub fn reset_stack_watermark(&self) {
        self.sp_low.set(u32::MAX);
    }

    // ============ Interrupt acceptance ============

    /// Hardware side of taking an interrupt
    ///
    /// Returns false if the request is masked: interrupts disabled, already
    /// at exception level, or `level` not above the current priority.
    /// Levels above [`CFG_INT_LEVEL_MAX`] do not exist and are never taken.
    pub fn accept(&self, level: OsIntLevel, vector: OsVectorNum) -> bool {
        if level > CFG_INT_LEVEL_MAX {
            return false;
        }
        let status = self.status.get();
        if status & ST_IE == 0 || status & ST_EXL != 0 || level <= self.int_level() {
            return false;
        }

        self.epc.set(self.pc.get());
        self.status.set(status | ST_EXL);
        self.cause.set(
            (self.cause.get() & !CAUSE_RIPL_MASK) | ((level as u32) << CAUSE_RIPL_SHIFT),
        );

        let css = self.srsctl.get() & SRS_CSS_MASK;
        let new_css = if self.shadow_level.get() == Some(level) { 1 } else { 0 };
        let srsctl = self.srsctl.get() & !(SRS_CSS_MASK | SRS_PSS_MASK);
        self.srsctl.set(srsctl | (css << SRS_PSS_SHIFT) | new_css);

        self.pc.set(VECTOR_BASE + vector as u32 * VECTOR_SPACING);
        true
    }

    /// Fire `vector` at `level` and run `body` through the trampoline
    /// variant `V`
    ///
    /// Returns false, without running anything, if the interrupt is masked.
    pub fn interrupt<V, S, F>(
        &self,
        ctx: &IsrContext,
        markers: &S,
        level: OsIntLevel,
        vector: OsVectorNum,
        body: F,
    ) -> bool
    where
        V: ContextSave<SimCpu>,
        S: TaskMarkers + ?Sized,
        F: FnOnce(),
    {
        if !self.accept(level, vector) {
            return false;
        }
        unsafe { dispatch::<SimCpu, V, S, F>(ctx, self, markers, body) };
        true
    }

    /// Fire a registered vector at `level`
    pub fn fire<V, S>(&self, vector: &Vector<V>, ctx: &IsrContext, markers: &S, level: OsIntLevel) -> bool
    where
        V: ContextSave<SimCpu>,
        S: TaskMarkers + ?Sized,
    {
        if !self.accept(level, vector.number()) {
            return false;
        }
        unsafe { vector.fire(ctx, self, markers) };
        true
    }
}

impl Default for SimCpu {
    fn default() -> Self {
        Self::new()
    }
}

impl IntPort for SimCpu {
    type Status = u32;

    fn status_save_int_dis(&self) -> u32 {
        let prev = self.status.get();
        self.status.set(prev & !ST_IE);
        prev
    }

    fn status_restore(&self, status: u32) {
        self.status.set(status);
    }

    fn int_disable(&self) {
        self.status.set(self.status.get() & !ST_IE);
    }

    fn is_int_disabled(&self) -> bool {
        self.status.get() & ST_IE == 0
    }

    fn pend_context_switch(&self) {
        self.ifs0.set(self.ifs0.get() | IFS0_CS0);
        self.pend_requests.set(self.pend_requests.get() + 1);
    }

    fn halt(&self) -> ! {
        panic!("simulated core halted at pc {:#010x}", self.pc.get());
    }
}

impl StackPort for SimCpu {
    type ExceptionState = SimExceptionState;
    type CallerSaved = SimCallerSaved;
    type Accumulator = SimAccumulator;

    const EXCEPTION_STATE_WORDS: usize = 3;
    const CALLER_SAVED_WORDS: usize = NUM_CALLER_SAVED;
    const ACCUMULATOR_WORDS: usize = 2;

    fn adopt_interrupted_sp(&self) {
        let sp = self.reg_in(self.previous_set(), reg::SP);
        self.set_reg(reg::SP, sp);
    }

    fn publish_sp(&self) {
        let sp = self.reg(reg::SP);
        self.set_reg_in(self.previous_set(), reg::SP, sp);
    }

    fn stack_pointer(&self) -> usize {
        self.reg(reg::SP) as usize
    }

    unsafe fn set_stack_pointer(&self, sp: usize) {
        let sp = sp as u32;
        if sp < self.sp_low.get() {
            self.sp_low.set(sp);
        }
        self.set_reg(reg::SP, sp);
    }

    fn active_level(&self) -> OsIntLevel {
        ((self.cause.get() & CAUSE_RIPL_MASK) >> CAUSE_RIPL_SHIFT) as OsIntLevel
    }

    fn int_enable_to_level(&self, level: OsIntLevel) {
        let status = self.status.get() & !ST_NESTED_CLEAR;
        self.status.set(status | ((level as u32) << ST_IPL_SHIFT) | ST_IE);
    }

    fn save_exception_state(&self) -> SimExceptionState {
        SimExceptionState {
            epc: self.epc.get(),
            srsctl: self.srsctl.get(),
            status: self.status.get(),
        }
    }

    fn restore_return_state(&self, state: &SimExceptionState) {
        self.epc.set(state.epc);
        self.srsctl.set(state.srsctl);
    }

    unsafe fn exception_return(&self, state: SimExceptionState) {
        // eret: resume at EPC on the previous register set with EXL cleared
        self.pc.set(self.epc.get());
        self.status.set(state.status & !ST_EXL);
        let srsctl = self.srsctl.get();
        let pss = (srsctl & SRS_PSS_MASK) >> SRS_PSS_SHIFT;
        self.srsctl.set((srsctl & !SRS_CSS_MASK) | pss);
    }

    fn save_caller_saved(&self) -> SimCallerSaved {
        let mut regs = [0; NUM_CALLER_SAVED];
        for (slot, &r) in regs.iter_mut().zip(CALLER_SAVED.iter()) {
            *slot = self.reg(r);
        }
        SimCallerSaved(regs)
    }

    fn restore_caller_saved(&self, regs: SimCallerSaved) {
        for (&value, &r) in regs.0.iter().zip(CALLER_SAVED.iter()) {
            self.set_reg(r, value);
        }
    }

    fn save_accumulator(&self) -> SimAccumulator {
        SimAccumulator {
            hi: self.hi.get(),
            lo: self.lo.get(),
        }
    }

    fn restore_accumulator(&self, acc: SimAccumulator) {
        self.set_hilo(acc.hi, acc.lo);
    }
}
