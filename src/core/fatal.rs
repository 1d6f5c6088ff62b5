//! Fatal error hook
//!
//! Higher layers call this when they detect corrupted kernel state.
//! Continuing with a broken scheduler is worse than stopping, so there is
//! no recovery path: the port halts in a way a debugger notices.

use crate::port::{self, IntPort};

/// Log `msg` and halt
#[cold]
#[inline(never)]
pub fn fatal_error(msg: &'static str) -> ! {
    crate::error!("fatal: {=str}", msg);
    #[cfg(not(all(feature = "defmt", target_arch = "arm")))]
    let _ = msg;
    let port = port::active();
    port.int_disable();
    port.halt()
}
