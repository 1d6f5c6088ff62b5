//! Compile-time configuration for the interrupt layer
//!
//! These constants are shared with the scheduler and task layers, which size
//! stacks and priority tables from them.

/// Width of the native `int`, in bits
pub const CFG_INT_WIDTH: usize = 32;

/// Size of a CPU register in bytes
pub const CFG_ALIGN: usize = core::mem::size_of::<*const ()>();

/// Number of task priority levels
///
/// Matches [`CFG_INT_WIDTH`] so the ready bitmap fits in one word.
pub const CFG_PRIORITIES_CNT: usize = CFG_INT_WIDTH;

/// Minimum task stack size, in words
///
/// Covers the full saved-register frame plus the arguments passed to the
/// task body.
pub const CFG_STK_SIZE_MIN: usize = 36;

/// Required alignment of stack arrays, in bytes
pub const CFG_STK_ALIGN: usize = 8;

/// Timeout value meaning "wait forever"
pub const CFG_WAIT_INFINITE: u32 = 0xFFFF_FFFF;

/// Pattern written into fresh stacks for high-watermark diagnostics
pub const CFG_FILL_STACK_VAL: u32 = 0xFEED_FACE;

/// Interrupt stack size, in words
///
/// Must hold the worst-case sum of trampoline and handler frames across
/// every nesting level the vector priorities allow.
pub const CFG_ISR_STK_SIZE: usize = 512;

/// Highest hardware interrupt priority level
pub const CFG_INT_LEVEL_MAX: u8 = 7;

/// Priority level of the pending context switch interrupt (the lowest one)
pub const CFG_SWITCH_CONTEXT_LEVEL: u8 = 1;
