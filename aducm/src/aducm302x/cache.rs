//! Flash instruction cache controller (`FLCC0_CACHE`).

use crate::arm_m::reg::{reg_accessors, Reg};

#[repr(C)]
pub(crate) struct Registers {
    stat:  Reg<u32>,
    setup: Reg<u32>,
    key:   Reg<u32>,
}

const CACHE_ADDRESS: usize = 0x4001_8058;

/// Written to `KEY` to unlock `SETUP` for one write.
const CACHE_KEY: u32 = 0xF123_F456;

bit_wrappers! {
    /// Cache status.
    pub struct CacheStat(pub u32);
    /// Cache setup.  Writes are ignored unless `KEY` was just written.
    pub struct CacheSetup(pub u32);
}

impl CacheStat {
    bitfield_accessors! {
        /// Instruction cache is enabled.
        pub total [0] get_icen / with_icen: bool,
    }
}

impl CacheSetup {
    bitfield_accessors! {
        /// Enable the instruction cache.
        pub total [0] get_icen / with_icen: bool,
        /// Lock the instruction cache contents.
        pub total [1] get_lckic / with_lckic: bool,
    }
}

pub struct Cache {
    reg: *const Registers,
}

unsafe impl Sync for Cache {}

pub static CACHE: Cache = Cache::at(CACHE_ADDRESS as *const Registers);

impl Cache {
    pub(crate) const fn at(reg: *const Registers) -> Cache {
        Cache { reg }
    }

    fn reg(&self) -> &Registers {
        unsafe { &*self.reg }
    }

    reg_accessors!(setup, CacheSetup, read_setup, write_setup, update_setup);

    pub fn read_stat(&self) -> CacheStat {
        CacheStat(self.reg().stat.get())
    }

    /// Turns the instruction cache on or off.
    pub fn set_instruction_cache(&self, enable: bool) {
        let setup = self.read_setup().with_icen(enable);
        self.reg().key.set(CACHE_KEY);
        self.write_setup(setup)
    }

    /// Reports whether the cache is configured on.
    pub fn instruction_cache_enabled(&self) -> bool {
        self.read_setup().get_icen() || self.read_stat().get_icen()
    }
}

#[cfg(test)]
impl Registers {
    pub(crate) fn zeroed() -> Registers {
        Registers { stat: Reg::new(0), setup: Reg::new(0), key: Reg::new(0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_writes_key_then_icen() {
        let regs = Registers::zeroed();
        let cache = Cache::at(&regs);
        regs.setup.set(CacheSetup(0).with_lckic(true).0);

        cache.set_instruction_cache(true);
        assert_eq!(regs.key.get(), CACHE_KEY);
        assert_eq!(regs.setup.get(), 0b11);
        assert!(cache.instruction_cache_enabled());

        cache.set_instruction_cache(false);
        assert_eq!(regs.setup.get(), 0b10);
        assert!(!cache.instruction_cache_enabled());
    }
}
