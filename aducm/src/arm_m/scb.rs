//! ARMv7-M System Control Block support.

use core::fmt;

use super::reg::{reg_accessors, Reg};
use super::{data_synchronization_barrier, instruction_synchronization_barrier};

#[repr(C)]
pub(crate) struct Registers {
    _cpuid:  Reg<u32>,
    _icsr:   Reg<u32>,
    vtor:    Reg<u32>,
    _aircr:  Reg<u32>,
}

const SCB_ADDRESS: usize = 0xe000ed00;

/// `VTOR` requires at least this alignment of any table it points at.
pub const VTOR_MIN_ALIGN: usize = 128;

/// Highest table address `TBLOFF` can express.
const VTOR_MAX_ADDRESS: usize = 0x3FFF_FF80;

pub struct Scb {
    reg: *const Registers,
}

unsafe impl Sync for Scb {}

pub static SCB: Scb = Scb::at(SCB_ADDRESS as *const Registers);

bit_wrappers! {
    /// Vector Table Offset Register.
    pub struct Vtor(pub u32);
}

impl Vtor {
    bitfield_accessors! {
        /// Table base address bits `[29:7]`; bit 29 selects SRAM over code
        /// space on parts with the r2p0 layout.
        pub total [29:7] get_tbloff / with_tbloff: u32,
    }

    /// The table address this register value designates.
    pub fn address(self) -> usize {
        (self.get_tbloff() << 7) as usize
    }
}

/// Reasons a table can't be installed with `set_vector_table`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VtorError {
    /// The address is not aligned to the table's size rounded up to a power
    /// of two (and at least `VTOR_MIN_ALIGN`).
    Misaligned { address: usize, required: usize },
    /// `TBLOFF` can't express the address.
    OutOfRange(usize),
}

impl fmt::Display for VtorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            VtorError::Misaligned { address, required } =>
                write!(f, "vector table at {:#x} needs {}-byte alignment",
                       address, required),
            VtorError::OutOfRange(address) =>
                write!(f, "vector table at {:#x} is beyond VTOR's reach", address),
        }
    }
}

/// Alignment VTOR demands of a table `table_bytes` long.
pub const fn vtor_alignment(table_bytes: usize) -> usize {
    let a = table_bytes.next_power_of_two();
    if a < VTOR_MIN_ALIGN { VTOR_MIN_ALIGN } else { a }
}

impl Scb {
    pub(crate) const fn at(reg: *const Registers) -> Scb {
        Scb { reg }
    }

    fn reg(&self) -> &Registers {
        unsafe { &*self.reg }
    }

    reg_accessors!(vtor, Vtor, read_vtor, write_vtor, update_vtor);

    /// Points exception dispatch at the `table_bytes`-long table based at
    /// `address`.  Barriers ensure the next exception taken uses the new
    /// table.
    pub fn set_vector_table(&self, address: usize, table_bytes: usize)
        -> Result<(), VtorError>
    {
        let required = vtor_alignment(table_bytes);
        if address % required != 0 {
            return Err(VtorError::Misaligned { address, required })
        }
        if address > VTOR_MAX_ADDRESS {
            return Err(VtorError::OutOfRange(address))
        }
        self.write_vtor(Vtor(0).with_tbloff((address >> 7) as u32));
        data_synchronization_barrier();
        instruction_synchronization_barrier();
        Ok(())
    }
}

#[cfg(test)]
impl Registers {
    pub(crate) fn zeroed() -> Registers {
        Registers {
            _cpuid: Reg::new(0),
            _icsr: Reg::new(0),
            vtor: Reg::new(0),
            _aircr: Reg::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vtor_address_round_trip() {
        let v = Vtor(0).with_tbloff(0x2000_0000 >> 7);
        assert_eq!(v.0, 0x2000_0000);
        assert_eq!(v.address(), 0x2000_0000);
    }

    #[test]
    fn alignment_follows_table_size() {
        assert_eq!(vtor_alignment(80 * 4), 512);
        assert_eq!(vtor_alignment(16 * 4), VTOR_MIN_ALIGN);
        assert_eq!(vtor_alignment(512), 512);
    }

    #[test]
    fn installs_aligned_table() {
        let regs = Registers::zeroed();
        let scb = Scb::at(&regs);
        assert_eq!(scb.set_vector_table(0x2000_0000, 80 * 4), Ok(()));
        assert_eq!(scb.read_vtor().address(), 0x2000_0000);
    }

    #[test]
    fn refuses_table_aligned_only_to_minimum() {
        let regs = Registers::zeroed();
        let scb = Scb::at(&regs);
        regs.vtor.set(0x0000_0200);
        // 128-aligned, but an 80-word table needs 512.
        assert_eq!(scb.set_vector_table(0x2000_0080, 80 * 4),
                   Err(VtorError::Misaligned { address: 0x2000_0080, required: 512 }));
        assert_eq!(scb.set_vector_table(0x4000_0000, 80 * 4),
                   Err(VtorError::OutOfRange(0x4000_0000)));
        assert_eq!(regs.vtor.get(), 0x0000_0200);
    }
}
