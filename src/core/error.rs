//! Error types for the kernel services built on this layer
//!
//! Uses Rust's Result pattern instead of C-style return codes.

use crate::core::isr;

/// RTOS error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", target_arch = "arm"), derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    /// No error
    None = 0,

    // ============ Generic errors ============
    /// Timeout expired (or a non-blocking call would have blocked)
    Timeout = 1,
    /// Object counter would overflow
    Overflow = 2,
    /// Called from the wrong context (task vs. interrupt)
    WContext = 3,
    /// Object is in the wrong state for this call
    WState = 4,
    /// Invalid parameter
    WParam = 5,
    /// Call is not allowed here (for example, unlocking a mutex it does not own)
    IllegalUse = 6,
    /// Object was never created or is corrupted
    InvalidObj = 7,
    /// Object was deleted while the caller waited on it
    Deleted = 8,
    /// Wait was released forcibly
    Forced = 9,

    // ============ Fatal errors ============
    /// Internal kernel error, should never happen
    Internal = 10,
}

/// Result type alias for RTOS operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == OsError::None
    }

    #[inline]
    pub fn is_err(self) -> bool {
        self != OsError::None
    }
}

/// Reject a call made outside of any interrupt
///
/// For services that only make sense inside a handler body.
#[inline]
pub fn check_int_context() -> OsResult<()> {
    if isr::inside_isr() {
        Ok(())
    } else {
        Err(OsError::WContext)
    }
}

/// Reject a call made from inside an interrupt
///
/// For services that may block or otherwise need a task context.
#[inline]
pub fn check_non_int_context() -> OsResult<()> {
    if isr::inside_isr() {
        Err(OsError::WContext)
    } else {
        Ok(())
    }
}
