//! ARMv7-M architecture support shared by every Cortex-M3 part.

pub mod exc;
pub mod nvic;
pub mod reg;
pub mod scb;
pub mod startup;

#[cfg(target_arch = "arm")]
use core::arch::asm;

/// Sets the processor's `PRIMASK` register to `val`.  While `PRIMASK` is set,
/// no configurable-priority exception can preempt.
#[inline]
pub fn set_primask(val: bool) {
    #[cfg(target_arch = "arm")]
    unsafe {
        asm!("msr PRIMASK, {}", in(reg) u32::from(val), options(nostack, preserves_flags))
    }
    #[cfg(not(target_arch = "arm"))]
    let _ = val;
}

/// Reads the processor's `PRIMASK` register.
#[inline]
pub fn primask() -> bool {
    #[cfg(target_arch = "arm")]
    {
        let v: u32;
        unsafe {
            asm!("mrs {}, PRIMASK", out(reg) v, options(nomem, nostack, preserves_flags))
        }
        v & 1 != 0
    }
    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}

/// Runs `f` with `PRIMASK` set, restoring the previous mask state afterwards.
/// Nesting is fine: an inner call leaves interrupts masked on the way out.
#[inline]
pub fn with_interrupts_masked<R, F: FnOnce() -> R>(f: F) -> R {
    let was_masked = primask();
    set_primask(true);
    let r = f();
    if !was_masked {
        set_primask(false)
    }
    r
}

/// Generates an instruction synchronization barrier (`ISB`) instruction.  For
/// other types of barriers, see Rust's fence operations.
#[inline]
pub fn instruction_synchronization_barrier() {
    #[cfg(target_arch = "arm")]
    unsafe {
        asm!("isb", options(nostack, preserves_flags))
    }
}

/// Generates a data synchronization barrier (`DSB`): every explicit memory
/// access before it completes before any instruction after it executes.
#[inline]
pub fn data_synchronization_barrier() {
    #[cfg(target_arch = "arm")]
    unsafe {
        asm!("dsb", options(nostack, preserves_flags))
    }
    #[cfg(not(target_arch = "arm"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Sleeps until an interrupt arrives.
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(target_arch = "arm")]
    unsafe {
        asm!("wfi", options(nomem, nostack, preserves_flags))
    }
}
