//! Core type definitions for the interrupt layer

/// Machine word
pub type OsWord = u32;

/// Stack element type
pub type OsStkElement = u32;

/// Interrupt nesting counter
pub type OsNestingCtr = u32;

/// Hardware interrupt priority level (0 = all enabled)
pub type OsIntLevel = u8;

/// Interrupt vector number
pub type OsVectorNum = u8;

/// Timeout in system ticks
pub type OsTimeout = u32;
