//! Support for the ARM Nested Vector Interrupt Controller, or NVIC.
//!
//! This is the interrupt controller used across all (current) M-profile
//! processors.  The operations here take raw interrupt numbers; the SoC
//! layer's `NvicExt` wraps them with the part's own `Interrupt` enum.

use core::sync::atomic;

use super::instruction_synchronization_barrier;
use super::reg::Reg;

#[repr(C)]
pub(crate) struct Registers {
    /// Interrupt Set Enable: writing ones enables the corresponding
    /// interrupts, reading returns the current enable state.
    iser: [Reg<u32>; 16], _reserved_after_iser: [Reg<u32>; 16],

    /// Interrupt Clear Enable: writing ones disables the corresponding
    /// interrupts.
    icer: [Reg<u32>; 16], _reserved_after_icer: [Reg<u32>; 16],

    /// Interrupt Set Pending.
    _ispr: [Reg<u32>; 16], _reserved_after_ispr: [Reg<u32>; 16],

    /// Interrupt Clear Pending.
    _icpr: [Reg<u32>; 16], _reserved_after_icpr: [Reg<u32>; 16],

    /// Interrupt Active Bit: 1 while the interrupt's handler is active.
    _iabr: [Reg<u32>; 16], _reserved_after_iabr: [Reg<u32>; 48],

    /// Interrupt Priority, one byte per interrupt.  Vendors may leave the low
    /// bits of each byte unimplemented.
    ipr: [Reg<u8>; 496],
}

const NVIC_ADDRESS: usize = 0xe000e100;

/// Driver for the NVIC.
///
/// Because operations on the NVIC affect interrupts, which are asynchronous
/// events that can affect program order and make things difficult to reason
/// about, the methods on `Nvic` are very carefully specified.
pub struct Nvic {
    reg: *const Registers,
}

impl Nvic {
    pub(crate) const fn at(reg: *const Registers) -> Nvic {
        Nvic { reg }
    }

    /// Ensures that an interrupt is enabled by the time this function returns.
    ///
    /// If the interrupt is pending, and the current execution priority allows
    /// it to preempt, the handler will have run *before this function returns*.
    #[inline]
    pub fn enable_irq_raw(&self, irq: u32) {
        let (bank, index) = Self::bank(irq);
        self.reg().iser[bank].set(1 << index);
        Self::write_barriers()
    }

    /// Ensures that an interrupt is disabled by the time this function returns.
    ///
    /// Code after a call to `disable_irq_raw` in program order can assume it
    /// will not be preempted by this interrupt, unless something else
    /// re-enables it.
    #[inline]
    pub fn disable_irq_raw(&self, irq: u32) {
        let (bank, index) = Self::bank(irq);
        self.reg().icer[bank].set(1 << index);
        Self::write_barriers()
    }

    /// Reports whether an interrupt is currently enabled.
    #[inline]
    pub fn is_enabled_raw(&self, irq: u32) -> bool {
        let (bank, index) = Self::bank(irq);
        atomic::fence(atomic::Ordering::Acquire);
        self.reg().iser[bank].get() & (1 << index) != 0
    }

    /// Sets the priority of an interrupt, synchronously.
    ///
    /// This may cause immediate preemption if `priority` is eligible to
    /// preempt at the current execution priority and `irq` is pending.
    #[inline]
    pub fn set_priority_raw(&self, irq: u32, priority: u8) {
        self.reg().ipr[irq as usize].set(priority);
        Self::write_barriers()
    }

    /// Reads the priority of an interrupt.
    #[inline]
    pub fn get_priority_raw(&self, irq: u32) -> u8 {
        atomic::fence(atomic::Ordering::Acquire);
        self.reg().ipr[irq as usize].get()
    }

    fn bank(irq: u32) -> (usize, u32) {
        ((irq / 32) as usize, irq % 32)
    }

    fn reg(&self) -> &Registers {
        unsafe { &*self.reg }
    }

    #[inline]
    fn write_barriers() {
        // Data fence to ensure the write is not buffered (emits DMB).
        atomic::fence(atomic::Ordering::Release);
        // Instruction barrier to flush any instructions fetched before the
        // write completed.
        instruction_synchronization_barrier()
    }
}

unsafe impl Sync for Nvic {}

/// Shared static instance of the `Nvic` driver.
pub static NVIC: Nvic = Nvic::at(NVIC_ADDRESS as *const Registers);
