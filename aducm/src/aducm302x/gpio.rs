//! General Purpose I/O (GPIO) interrupt routing and driver state.
//!
//! The ADuCM302x has three 16-pin GPIO ports.  Any pin can be routed to one
//! of two shared group interrupts (A and B), and four pins additionally have
//! dedicated external interrupt lines, controlled by `XINT0`.  This driver
//! owns the callback table behind those six interrupts, and the
//! reference-counted initialization state shared by everything that uses
//! GPIO.
//!
//! Pin drive configuration is out of this driver's hands.

use core::cell::UnsafeCell;
use core::fmt;
use core::ptr;

use bitflags::bitflags;

use crate::arm_m::reg::Reg;
use crate::arm_m::with_interrupts_masked;

use super::irq::Interrupt;
use super::vectors::VectorTableBuilder;

/// A GPIO port's memory mapped registers.  The 16-bit registers each occupy
/// the low half of a word.
#[repr(C)]
pub(crate) struct PortRegisters {
    cfg:  Reg<u32>,
    oen:  Reg<u16>, _pad0: Reg<u16>,
    pe:   Reg<u16>, _pad1: Reg<u16>,
    _ien: Reg<u16>, _pad2: Reg<u16>,
    _in:  Reg<u16>, _pad3: Reg<u16>,
    _out: Reg<u16>, _pad4: Reg<u16>,
    _set: Reg<u16>, _pad5: Reg<u16>,
    _clr: Reg<u16>, _pad6: Reg<u16>,
    _tgl: Reg<u16>, _pad7: Reg<u16>,
    pol:  Reg<u16>, _pad8: Reg<u16>,
    iena: Reg<u16>, _pad9: Reg<u16>,
    ienb: Reg<u16>, _pad10: Reg<u16>,
    /// Group interrupt status.  Write one to clear.
    int:  Reg<u16>, _pad11: Reg<u16>,
    _ds:  Reg<u16>, _pad12: Reg<u16>,
}

/// External interrupt controller registers.
#[repr(C)]
pub(crate) struct XintRegisters {
    _cfg0:     Reg<u32>,
    _ext_stat: Reg<u32>,
    _reserved: [Reg<u32>; 2],
    /// Write one to clear a latched external interrupt.
    clr:       Reg<u32>,
    _nmiclr:   Reg<u32>,
}

const PORT_ADDRESSES: [usize; PORT_COUNT] = [0x4002_0000, 0x4002_0040, 0x4002_0080];
const XINT0_ADDRESS: usize = 0x4000_1020;

/// Number of GPIO ports.
pub const PORT_COUNT: usize = 3;

/// Power-up values written to each port by the first `init`.
const DEFAULT_CFG: u32 = 0;
const DEFAULT_OEN: u16 = 0;
const DEFAULT_PE: u16 = 0;
const DEFAULT_POL: u16 = 0;
const DEFAULT_IENA: u16 = 0;
const DEFAULT_IENB: u16 = 0;
const DEFAULT_INT: u16 = 0xFF;

bitflags! {
    /// A set of pins on one port.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct Pins: u16 {
        const P0 = 1 << 0;
        const P1 = 1 << 1;
        const P2 = 1 << 2;
        const P3 = 1 << 3;
        const P4 = 1 << 4;
        const P5 = 1 << 5;
        const P6 = 1 << 6;
        const P7 = 1 << 7;
        const P8 = 1 << 8;
        const P9 = 1 << 9;
        const P10 = 1 << 10;
        const P11 = 1 << 11;
        const P12 = 1 << 12;
        const P13 = 1 << 13;
        const P14 = 1 << 14;
        const P15 = 1 << 15;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Port {
    P0 = 0,
    P1 = 1,
    P2 = 2,
}

impl Port {
    pub const ALL: [Port; PORT_COUNT] = [Port::P0, Port::P1, Port::P2];
}

/// The two shared pin-group interrupts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Group {
    A,
    B,
}

/// The six interrupts this driver dispatches, in callback table order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GpioIrq {
    Ext0 = 0,
    Ext1 = 1,
    Ext2 = 2,
    Ext3 = 3,
    GroupA = 4,
    GroupB = 5,
}

const CALLBACK_COUNT: usize = 6;

impl GpioIrq {
    pub const ALL: [GpioIrq; CALLBACK_COUNT] = [
        GpioIrq::Ext0, GpioIrq::Ext1, GpioIrq::Ext2, GpioIrq::Ext3,
        GpioIrq::GroupA, GpioIrq::GroupB,
    ];

    /// The NVIC interrupt this is delivered on.
    pub const fn interrupt(self) -> Interrupt {
        match self {
            GpioIrq::Ext0 => Interrupt::ExtInt0,
            GpioIrq::Ext1 => Interrupt::ExtInt1,
            GpioIrq::Ext2 => Interrupt::ExtInt2,
            GpioIrq::Ext3 => Interrupt::ExtInt3,
            GpioIrq::GroupA => Interrupt::GpioA,
            GpioIrq::GroupB => Interrupt::GpioB,
        }
    }
}

/// What a callback is being told about.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// External interrupt line `0..=3` fired.
    External(u8),
    /// Pins on `port` routed to `group` are pending.
    Group { group: Group, port: Port, pins: Pins },
}

/// Application callback.  Receives the parameter given at registration and
/// runs in interrupt context.
pub type Callback = fn(param: *mut (), event: Event);

#[derive(Copy, Clone)]
struct CallbackInfo {
    callback: Option<Callback>,
    param: *mut (),
}

impl CallbackInfo {
    const EMPTY: CallbackInfo = CallbackInfo { callback: None, param: ptr::null_mut() };
}

struct DeviceData {
    reference_count: u32,
    callbacks: [CallbackInfo; CALLBACK_COUNT],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The operation needs a prior `init`.
    NotInitialized,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotInitialized => f.write_str("GPIO driver not initialized"),
        }
    }
}

/// GPIO driver.  There is exactly one, `GPIO`.
pub struct GpioDriver {
    ports: [*const PortRegisters; PORT_COUNT],
    xint: *const XintRegisters,
    data: UnsafeCell<DeviceData>,
}

unsafe impl Sync for GpioDriver {}

pub static GPIO: GpioDriver = GpioDriver::at(
    [PORT_ADDRESSES[0] as *const PortRegisters,
     PORT_ADDRESSES[1] as *const PortRegisters,
     PORT_ADDRESSES[2] as *const PortRegisters],
    XINT0_ADDRESS as *const XintRegisters);

impl GpioDriver {
    pub(crate) const fn at(ports: [*const PortRegisters; PORT_COUNT],
                           xint: *const XintRegisters) -> GpioDriver {
        GpioDriver {
            ports,
            xint,
            data: UnsafeCell::new(DeviceData {
                reference_count: 0,
                callbacks: [CallbackInfo::EMPTY; CALLBACK_COUNT],
            }),
        }
    }

    fn port(&self, port: Port) -> &PortRegisters {
        unsafe { &*self.ports[port as usize] }
    }

    fn xint(&self) -> &XintRegisters {
        unsafe { &*self.xint }
    }

    /// Runs `f` on the driver state with interrupts masked.  Single core, so
    /// masking is all the exclusion there is to have.
    fn with_data<R, F: FnOnce(&mut DeviceData) -> R>(&self, f: F) -> R {
        with_interrupts_masked(|| f(unsafe { &mut *self.data.get() }))
    }

    /// Takes a reference on the driver.  The first reference puts every port
    /// back to its power-up configuration and empties the callback table;
    /// later ones only count.
    pub fn init(&self) {
        let count = self.with_data(|d| {
            if d.reference_count == 0 {
                for p in Port::ALL {
                    let r = self.port(p);
                    r.cfg.set(DEFAULT_CFG);
                    r.oen.set(DEFAULT_OEN);
                    r.pe.set(DEFAULT_PE);
                    r.pol.set(DEFAULT_POL);
                    r.iena.set(DEFAULT_IENA);
                    r.ienb.set(DEFAULT_IENB);
                    r.int.set(DEFAULT_INT);
                }
                d.callbacks = [CallbackInfo::EMPTY; CALLBACK_COUNT];
            }
            d.reference_count += 1;
            d.reference_count
        });
        log::debug!("gpio: init, {} reference(s)", count);
    }

    /// Drops a reference.  Dropping the last one empties the callback table.
    pub fn uninit(&self) -> Result<(), Error> {
        let count = self.with_data(|d| {
            if d.reference_count == 0 {
                return Err(Error::NotInitialized)
            }
            d.reference_count -= 1;
            if d.reference_count == 0 {
                d.callbacks = [CallbackInfo::EMPTY; CALLBACK_COUNT];
            }
            Ok(d.reference_count)
        })?;
        log::debug!("gpio: uninit, {} reference(s)", count);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.with_data(|d| d.reference_count != 0)
    }

    /// Routes `irq` to `callback`, replacing any earlier registration.
    /// `param` is handed back to the callback untouched.
    pub fn register_callback(&self, irq: GpioIrq, callback: Callback, param: *mut ())
        -> Result<(), Error>
    {
        self.with_data(|d| {
            if d.reference_count == 0 {
                return Err(Error::NotInitialized)
            }
            d.callbacks[irq as usize] = CallbackInfo { callback: Some(callback), param };
            Ok(())
        })?;
        log::debug!("gpio: callback registered for {:?}", irq);
        Ok(())
    }

    /// Makes `pins` (and only those) on `port` raise `group`'s interrupt.
    pub fn set_group_pins(&self, port: Port, group: Group, pins: Pins) -> Result<(), Error> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized)
        }
        let r = self.port(port);
        match group {
            Group::A => r.iena.set(pins.bits()),
            Group::B => r.ienb.set(pins.bits()),
        }
        Ok(())
    }

    /// Handles `irq`: acknowledges it in hardware and runs the registered
    /// callback, if any.  Does nothing while the driver is uninitialized.
    pub fn dispatch(&self, irq: GpioIrq) {
        let info = self.with_data(|d| {
            if d.reference_count == 0 { None } else { Some(d.callbacks[irq as usize]) }
        });
        let Some(info) = info else { return };

        match irq {
            GpioIrq::Ext0 | GpioIrq::Ext1 | GpioIrq::Ext2 | GpioIrq::Ext3 => {
                let line = irq as u8;
                self.xint().clr.set(1 << line);
                if let Some(cb) = info.callback {
                    cb(info.param, Event::External(line))
                }
            }
            GpioIrq::GroupA | GpioIrq::GroupB => {
                let group = if irq == GpioIrq::GroupA { Group::A } else { Group::B };
                for port in Port::ALL {
                    let r = self.port(port);
                    let enabled = match group {
                        Group::A => r.iena.get(),
                        Group::B => r.ienb.get(),
                    };
                    let pending = r.int.get() & enabled;
                    if pending == 0 {
                        continue
                    }
                    r.int.set(pending);
                    if let Some(cb) = info.callback {
                        cb(info.param, Event::Group {
                            group,
                            port,
                            pins: Pins::from_bits_retain(pending),
                        })
                    }
                }
            }
        }
    }
}

crate::isr! {
    pub fn ext_int0_handler() { GPIO.dispatch(GpioIrq::Ext0) }
}
crate::isr! {
    pub fn ext_int1_handler() { GPIO.dispatch(GpioIrq::Ext1) }
}
crate::isr! {
    pub fn ext_int2_handler() { GPIO.dispatch(GpioIrq::Ext2) }
}
crate::isr! {
    pub fn ext_int3_handler() { GPIO.dispatch(GpioIrq::Ext3) }
}
crate::isr! {
    pub fn group_a_handler() { GPIO.dispatch(GpioIrq::GroupA) }
}
crate::isr! {
    pub fn group_b_handler() { GPIO.dispatch(GpioIrq::GroupB) }
}

/// Binds the six GPIO interrupt handlers into a vector table under
/// construction.
pub const fn bind_handlers(builder: VectorTableBuilder) -> VectorTableBuilder {
    builder
        .interrupt(Interrupt::ExtInt0, ext_int0_handler)
        .interrupt(Interrupt::ExtInt1, ext_int1_handler)
        .interrupt(Interrupt::ExtInt2, ext_int2_handler)
        .interrupt(Interrupt::ExtInt3, ext_int3_handler)
        .interrupt(Interrupt::GpioA, group_a_handler)
        .interrupt(Interrupt::GpioB, group_b_handler)
}
