//! Stack storage and usage diagnostics
//!
//! Stacks grow downward. Fresh stacks are filled with
//! [`CFG_FILL_STACK_VAL`]; the words at the low end that still hold the
//! pattern were never touched, which gives the high watermark.

use crate::config::{CFG_FILL_STACK_VAL, CFG_STK_SIZE_MIN};
use crate::types::OsStkElement;

/// Word array aligned the way the port requires for stacks
#[repr(C, align(8))]
pub struct Stack<const N: usize> {
    words: [OsStkElement; N],
}

impl<const N: usize> Stack<N> {
    const SIZE_OK: () = assert!(N >= CFG_STK_SIZE_MIN, "stack smaller than CFG_STK_SIZE_MIN");

    /// A stack already filled with the diagnostic pattern
    pub const fn new() -> Self {
        let () = Self::SIZE_OK;
        Self {
            words: [CFG_FILL_STACK_VAL; N],
        }
    }

    /// Size in words
    #[inline(always)]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Address one past the highest word, the initial stack pointer
    #[inline(always)]
    pub fn top(&self) -> usize {
        self.words.as_ptr_range().end as usize
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[OsStkElement] {
        &self.words
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [OsStkElement] {
        &mut self.words
    }

    /// Words never written since the last fill
    #[inline]
    pub fn unused(&self) -> usize {
        stack_unused(&self.words)
    }
}

impl<const N: usize> Default for Stack<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the diagnostic pattern over the whole stack
pub fn stack_fill(stk: &mut [OsStkElement]) {
    stk.fill(CFG_FILL_STACK_VAL);
}

/// Count the untouched words at the low end of a filled stack
pub fn stack_unused(stk: &[OsStkElement]) -> usize {
    stk.iter().take_while(|&&w| w == CFG_FILL_STACK_VAL).count()
}
