//! Interrupt support for the ADuCM302x.
//!
//! This module adapts the primitive NVIC support in `arm_m::nvic` to the
//! ADuCM302x.  It provides:
//! - `enum Interrupt`, naming the 55 wired programmable interrupts.
//! - `struct InterruptTable`, the vendor half of the vector table.
//! - `isr!`, which declares a peripheral handler with the signature the
//!   build configuration expects.
//! - `trait NvicExt` to extend the NVIC with operations using
//!   ADuCM302x-specific vector numbers and widths.

use crate::arm_m::nvic;

/// A peripheral interrupt handler.
#[cfg(not(feature = "rtos"))]
pub type IrqHandler = extern "C" fn();

/// A peripheral interrupt handler.  Under an RTOS, handlers are entered
/// through the OS dispatcher with their interrupt ID and an argument.
#[cfg(feature = "rtos")]
pub type IrqHandler = extern "C" fn(iid: u32, arg: *mut core::ffi::c_void);

/// Declares a peripheral interrupt handler with the `IrqHandler` signature of
/// the current build, so the same driver source works with and without the
/// `rtos` feature.
///
/// ```ignore
/// aducm::isr! {
///     /// Counts RTC1 ticks.
///     pub fn rtc1_tick() {
///         TICKS.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
#[cfg(not(feature = "rtos"))]
#[macro_export]
macro_rules! isr {
    ($(#[$m:meta])* $vis:vis fn $name:ident() $body:block) => {
        $(#[$m])*
        $vis extern "C" fn $name() $body
    };
}

#[cfg(feature = "rtos")]
#[macro_export]
macro_rules! isr {
    ($(#[$m:meta])* $vis:vis fn $name:ident() $body:block) => {
        $(#[$m])*
        $vis extern "C" fn $name(_iid: u32, _arg: *mut ::core::ffi::c_void) $body
    };
}

/// Number of programmable interrupt slots in the vector table.
pub const INTERRUPT_COUNT: usize = 64;

/// Programmable interrupt numbers the silicon leaves unconnected.
pub const RESERVED_INTERRUPTS: [u8; 9] = [47, 48, 49, 50, 51, 52, 53, 54, 55];

/// Enumeration of the ADuCM302x interrupts.  This can be used to name an
/// interrupt vector, like an integer, but without the risk of receiving
/// out-of-range values, and without any way to name a reserved slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Interrupt {
    Rtc1 = 0,
    ExtInt0 = 1,
    ExtInt1 = 2,
    ExtInt2 = 3,
    ExtInt3 = 4,
    Wdt = 5,
    VregOver = 6,
    BatteryVoltage = 7,
    Rtc0 = 8,
    GpioA = 9,
    GpioB = 10,
    Tmr0 = 11,
    Tmr1 = 12,
    Flash0 = 13,
    Uart = 14,
    Spi0 = 15,
    Spi2 = 16,
    I2c0Slave = 17,
    I2c0Master = 18,
    DmaErr = 19,
    DmaSpi2Tx = 20,
    DmaSpi2Rx = 21,
    DmaSport0A = 22,
    DmaSport0B = 23,
    DmaSpi0Tx = 24,
    DmaSpi0Rx = 25,
    DmaSpi1Tx = 26,
    DmaSpi1Rx = 27,
    DmaUartTx = 28,
    DmaUartRx = 29,
    DmaI2c0Stx = 30,
    DmaI2c0Srx = 31,
    DmaI2c0Mx = 32,
    DmaAes0In = 33,
    DmaAes0Out = 34,
    DmaFlash0 = 35,
    Sport0A = 36,
    Sport0B = 37,
    Crypto = 38,
    DmaAdc0 = 39,
    Tmr2 = 40,
    CrystalOsc = 41,
    Spi1 = 42,
    Pll = 43,
    Rng = 44,
    Beep = 45,
    Adc = 46,

    DmaSip0 = 56,
    DmaSip1 = 57,
    DmaSip2 = 58,
    DmaSip3 = 59,
    DmaSip4 = 60,
    DmaSip5 = 61,
    DmaSip6 = 62,
    DmaSip7 = 63,
}

impl Interrupt {
    pub const ALL: [Interrupt; 55] = [
        Interrupt::Rtc1, Interrupt::ExtInt0, Interrupt::ExtInt1,
        Interrupt::ExtInt2, Interrupt::ExtInt3, Interrupt::Wdt,
        Interrupt::VregOver, Interrupt::BatteryVoltage, Interrupt::Rtc0,
        Interrupt::GpioA, Interrupt::GpioB, Interrupt::Tmr0, Interrupt::Tmr1,
        Interrupt::Flash0, Interrupt::Uart, Interrupt::Spi0, Interrupt::Spi2,
        Interrupt::I2c0Slave, Interrupt::I2c0Master, Interrupt::DmaErr,
        Interrupt::DmaSpi2Tx, Interrupt::DmaSpi2Rx, Interrupt::DmaSport0A,
        Interrupt::DmaSport0B, Interrupt::DmaSpi0Tx, Interrupt::DmaSpi0Rx,
        Interrupt::DmaSpi1Tx, Interrupt::DmaSpi1Rx, Interrupt::DmaUartTx,
        Interrupt::DmaUartRx, Interrupt::DmaI2c0Stx, Interrupt::DmaI2c0Srx,
        Interrupt::DmaI2c0Mx, Interrupt::DmaAes0In, Interrupt::DmaAes0Out,
        Interrupt::DmaFlash0, Interrupt::Sport0A, Interrupt::Sport0B,
        Interrupt::Crypto, Interrupt::DmaAdc0, Interrupt::Tmr2,
        Interrupt::CrystalOsc, Interrupt::Spi1, Interrupt::Pll, Interrupt::Rng,
        Interrupt::Beep, Interrupt::Adc,
        Interrupt::DmaSip0, Interrupt::DmaSip1, Interrupt::DmaSip2,
        Interrupt::DmaSip3, Interrupt::DmaSip4, Interrupt::DmaSip5,
        Interrupt::DmaSip6, Interrupt::DmaSip7,
    ];

    /// Index of this interrupt's word in the vector table.
    pub const fn slot(self) -> usize {
        self as usize + 16
    }
}

isr! {
    /// Default for every wired interrupt nobody binds.  An interrupt that was
    /// enabled without a handler is treated as spurious and simply returns.
    #[inline(never)]
    pub fn unbound_interrupt() {}
}

isr! {
    /// Occupies the reserved interrupt slots.  Spins.
    #[inline(never)]
    pub fn reserved_interrupt() {
        crate::arm_m::startup::halt()
    }
}

/// The ADuCM302x's vendor-specific (NVIC) vector table.  This is separate from
/// the ARMv7-M Exception Table, and must be placed immediately after it in ROM
/// or RAM; `vectors::VectorTable` does exactly that.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct InterruptTable {
    vectors: [IrqHandler; INTERRUPT_COUNT],
}

impl InterruptTable {
    /// A table with wired interrupts unbound and reserved slots filled with
    /// the spinning placeholder.
    pub const fn new() -> InterruptTable {
        let mut vectors = [unbound_interrupt as IrqHandler; INTERRUPT_COUNT];
        let mut i = 0;
        while i < RESERVED_INTERRUPTS.len() {
            vectors[RESERVED_INTERRUPTS[i] as usize] = reserved_interrupt;
            i += 1;
        }
        InterruptTable { vectors }
    }

    /// Returns this table with `irq` bound to `handler`.
    pub const fn with(mut self, irq: Interrupt, handler: IrqHandler) -> Self {
        self.vectors[irq as usize] = handler;
        self
    }

    /// The handler currently bound to `irq`.
    pub const fn handler(&self, irq: Interrupt) -> IrqHandler {
        self.vectors[irq as usize]
    }
}

impl Default for InterruptTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The ADuCM302x implements three bits of priority in the top of each NVIC
/// priority byte.
const PRIO_SHIFT: u32 = 5;

/// Enumeration of the ADuCM302x interrupt priority values, acting like a
/// three-bit integer so priorities never need range checks at runtime.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Priority {
    P0 = 0, P1, P2, P3, P4, P5, P6, P7,
}

/// Extension trait for `arm_m::Nvic` adding operations that deal in
/// ADuCM302x-specific enumerations.
pub trait NvicExt {
    /// Ensures that an interrupt is enabled by the time this function returns.
    ///
    /// If the interrupt is pending, and the current execution priority allows
    /// it to preempt, the handler will have run *before this function returns*.
    fn enable_irq(&self, irq: Interrupt);

    /// Ensures that an interrupt is disabled by the time this function returns.
    fn disable_irq(&self, irq: Interrupt);

    /// Reports whether an interrupt is enabled.
    fn is_enabled(&self, irq: Interrupt) -> bool;

    /// Sets the priority of an interrupt, synchronously.
    fn set_priority(&self, irq: Interrupt, priority: Priority);

    /// Reads the priority of an interrupt.
    fn get_priority(&self, irq: Interrupt) -> Priority;
}

impl NvicExt for nvic::Nvic {
    fn enable_irq(&self, irq: Interrupt) {
        self.enable_irq_raw(irq as u32)
    }

    fn disable_irq(&self, irq: Interrupt) {
        self.disable_irq_raw(irq as u32)
    }

    fn is_enabled(&self, irq: Interrupt) -> bool {
        self.is_enabled_raw(irq as u32)
    }

    fn set_priority(&self, irq: Interrupt, priority: Priority) {
        self.set_priority_raw(irq as u32, (priority as u8) << PRIO_SHIFT)
    }

    fn get_priority(&self, irq: Interrupt) -> Priority {
        match self.get_priority_raw(irq as u32) >> PRIO_SHIFT {
            0 => Priority::P0,
            1 => Priority::P1,
            2 => Priority::P2,
            3 => Priority::P3,
            4 => Priority::P4,
            5 => Priority::P5,
            6 => Priority::P6,
            _ => Priority::P7,
        }
    }
}
