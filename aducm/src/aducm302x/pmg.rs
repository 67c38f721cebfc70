//! Power management (`PMG0`): key-protected power mode control, SRAM
//! retention, instruction SRAM configuration and reset status.

use core::fmt;

use bitflags::bitflags;

use crate::arm_m::reg::{reg_accessors, Reg};

use super::cache::Cache;

#[repr(C)]
pub(crate) struct Registers {
    _ien:         Reg<u32>,
    _psm_stat:    Reg<u32>,
    _pwrmod:      Reg<u32>,
    /// Writing the two key values in sequence unlocks one protected write.
    pwrkey:       Reg<u32>,
    _shdn_stat:   Reg<u32>,
    sramret:      Reg<u32>,
    _reserved0:   [Reg<u32>; 10],
    rst_stat:     Reg<u32>,
    _ctl1:        Reg<u32>,
    _reserved1:   [Reg<u32>; 134],
    tst_sram_ctl: Reg<u32>,
}

const PMG0_ADDRESS: usize = 0x4004_C000;

/// Sequence written to `PWRKEY` before a protected write.
const PWRKEY_SEQUENCE: [u32; 2] = [0x4859, 0xF27B];

bit_wrappers! {
    /// SRAM retention control.  Key protected.
    pub struct Sramret(pub u32);
    /// SRAM test and instruction SRAM control.
    pub struct TstSramCtl(pub u32);
}

impl Sramret {
    bitfield_accessors! {
        /// Retain SRAM bank 1 in hibernate.
        pub total [0] get_bnk1en / with_bnk1en: bool,
        /// Retain SRAM bank 2 in hibernate.
        pub total [1] get_bnk2en / with_bnk2en: bool,
    }
}

impl TstSramCtl {
    bitfield_accessors! {
        /// Map the instruction SRAM bank as code memory.
        pub total [31] get_instren / with_instren: bool,
    }
}

/// SRAM banks with optional hibernate retention.  Bank 0 is always retained.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SramBank {
    Bank1,
    Bank2,
}

bitflags! {
    /// Causes of the most recent reset, from `RST_STAT`.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct ResetCause: u32 {
        const POWER_ON = 1 << 0;
        const EXTERNAL = 1 << 1;
        const WATCHDOG = 1 << 2;
        const SOFTWARE = 1 << 3;
    }
}

/// Errors from instruction SRAM reconfiguration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IsramError {
    /// The instruction SRAM can't be remapped while the cache, which shares
    /// its memory, is turned on.
    CacheEnabled,
}

impl fmt::Display for IsramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsramError::CacheEnabled => f.write_str("instruction cache is enabled"),
        }
    }
}

pub struct Pmg {
    reg: *const Registers,
}

unsafe impl Sync for Pmg {}

pub static PMG0: Pmg = Pmg::at(PMG0_ADDRESS as *const Registers);

impl Pmg {
    pub(crate) const fn at(reg: *const Registers) -> Pmg {
        Pmg { reg }
    }

    fn reg(&self) -> &Registers {
        unsafe { &*self.reg }
    }

    reg_accessors!(sramret, Sramret, read_sramret, write_sramret, update_sramret);
    reg_accessors!(tst_sram_ctl, TstSramCtl, read_tst_sram_ctl, write_tst_sram_ctl,
                   update_tst_sram_ctl);

    /// Writes the key sequence that allows the next write to a protected
    /// register (`PWRMOD`, `SRAMRET`).
    pub fn unlock(&self) {
        for &k in PWRKEY_SEQUENCE.iter() {
            self.reg().pwrkey.set(k)
        }
    }

    /// Turns hibernate retention of `bank` on or off.
    pub fn set_retention(&self, bank: SramBank, retain: bool) {
        let r = self.read_sramret();
        let r = match bank {
            SramBank::Bank1 => r.with_bnk1en(retain),
            SramBank::Bank2 => r.with_bnk2en(retain),
        };
        self.unlock();
        self.write_sramret(r)
    }

    /// Drops hibernate retention for both optional banks.  The caller must
    /// have called `unlock` first.
    pub fn clear_retention(&self) {
        self.update_sramret(|r| r.with_bnk1en(false).with_bnk2en(false))
    }

    /// Maps the instruction SRAM bank as code memory (`true`) or returns it to
    /// data memory (`false`).  Refused while `cache` is on.
    pub fn set_instruction_sram(&self, enable: bool, cache: &Cache)
        -> Result<(), IsramError>
    {
        if cache.instruction_cache_enabled() {
            return Err(IsramError::CacheEnabled)
        }
        self.update_tst_sram_ctl(|r| r.with_instren(enable));
        Ok(())
    }

    /// Reads the reset cause flags and clears them, so the next reset
    /// reports only its own cause.
    pub fn reset_cause(&self) -> ResetCause {
        let raw = self.reg().rst_stat.get();
        // Write-one-to-clear.
        self.reg().rst_stat.set(raw);
        ResetCause::from_bits_truncate(raw)
    }
}

#[cfg(test)]
impl Registers {
    pub(crate) fn zeroed() -> Registers {
        // Every field is a `Reg`, for which all-zeroes is a valid value.
        unsafe { core::mem::zeroed() }
    }

    pub(crate) fn pwrkey(&self) -> u32 {
        self.pwrkey.get()
    }

    pub(crate) fn sramret(&self) -> u32 {
        self.sramret.get()
    }

    pub(crate) fn sramret_set(&self, v: u32) {
        self.sramret.set(v)
    }

    pub(crate) fn tst_sram_ctl(&self) -> u32 {
        self.tst_sram_ctl.get()
    }

    pub(crate) fn tst_sram_ctl_set(&self, v: u32) {
        self.tst_sram_ctl.set(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aducm302x::cache;
    use core::mem::offset_of;

    #[test]
    fn register_offsets() {
        assert_eq!(offset_of!(Registers, _ien), 0x00);
        assert_eq!(offset_of!(Registers, _psm_stat), 0x04);
        assert_eq!(offset_of!(Registers, _pwrmod), 0x08);
        assert_eq!(offset_of!(Registers, pwrkey), 0x0C);
        assert_eq!(offset_of!(Registers, _shdn_stat), 0x10);
        assert_eq!(offset_of!(Registers, sramret), 0x14);
        assert_eq!(offset_of!(Registers, rst_stat), 0x40);
        assert_eq!(offset_of!(Registers, _ctl1), 0x44);
        assert_eq!(offset_of!(Registers, tst_sram_ctl), 0x260);
    }

    #[test]
    fn retention_keeps_other_bank() {
        let regs = Registers::zeroed();
        let pmg = Pmg::at(&regs);
        regs.sramret.set(0b11);
        pmg.unlock();
        pmg.clear_retention();
        assert_eq!(regs.sramret(), 0);
        pmg.set_retention(SramBank::Bank1, true);
        assert_eq!(regs.sramret(), 0b01);
        assert_eq!(regs.pwrkey(), 0xF27B);
    }

    #[test]
    fn isram_refused_with_cache_on() {
        let regs = Registers::zeroed();
        let pmg = Pmg::at(&regs);
        regs.tst_sram_ctl.set(1 << 31);

        let cregs = cache::Registers::zeroed();
        let c = Cache::at(&cregs);
        c.set_instruction_cache(true);
        assert_eq!(pmg.set_instruction_sram(false, &c), Err(IsramError::CacheEnabled));
        assert_eq!(regs.tst_sram_ctl(), 1 << 31);

        c.set_instruction_cache(false);
        assert_eq!(pmg.set_instruction_sram(false, &c), Ok(()));
        assert_eq!(regs.tst_sram_ctl(), 0);
    }

    #[test]
    fn reset_cause_decodes_and_clears() {
        let regs = Registers::zeroed();
        let pmg = Pmg::at(&regs);
        regs.rst_stat.set(0b1010);
        assert_eq!(pmg.reset_cause(), ResetCause::EXTERNAL | ResetCause::SOFTWARE);
        // The simulated register has no W1C logic; the write-back is what
        // matters.
        assert_eq!(regs.rst_stat.get(), 0b1010);
    }
}
