//! Core interrupt-layer modules
//!
//! Contains the critical section guard, nesting tracker, stack banks,
//! vector trampolines and the preemption request.

pub mod config;
pub mod critical;
pub mod error;
pub mod fatal;
pub mod isr;
pub mod nesting;
pub mod preempt;
pub mod stack;
pub mod stack_bank;
pub mod trampoline;
pub mod types;
