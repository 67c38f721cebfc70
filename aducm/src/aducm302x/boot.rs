//! Reset handling, from the reset vector to the application entry point.
//!
//! The processor enters `aducm_reset_vector` with whatever stack pointer the
//! boot ROM left behind.  The entry re-seeds MSP from word 0 of
//! `__vector_table` and jumps into `reset_sequence`, which runs each bring-up
//! step exactly once, in order:
//!
//! 1. unlock the power management registers,
//! 2. retain SRAM bank 1 (and only bank 1) across hibernate,
//! 3. return the instruction SRAM to data memory (`disable-isram`),
//! 4. enable the instruction cache (`icache`),
//! 5. copy the vector table into SRAM (`relocate-ivt`),
//! 6. initialize `.data` and `.bss`,
//! 7. call the application's `aducm_main`,
//! 8. park the processor if that ever returns.
//!
//! Nothing on this path may use a `static` in RAM before step 6.

use super::cache::Cache;
use super::pmg::{Pmg, SramBank};

/// Bring-up options.  The target build uses `BOOT_CONFIG`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BootConfig {
    /// Remap the instruction SRAM bank as data memory.
    pub disable_isram: bool,
    /// Turn on the flash instruction cache.
    pub enable_icache: bool,
    /// Copy the vector table to `vectors::RELOCATION_ADDRESS`.
    pub relocate_vectors: bool,
}

/// Configuration selected by this crate's Cargo features.
pub const BOOT_CONFIG: BootConfig = BootConfig {
    disable_isram: cfg!(feature = "disable-isram"),
    enable_icache: cfg!(feature = "icache"),
    relocate_vectors: cfg!(feature = "relocate-ivt"),
};

/// Read-protection key hash the boot kernel compares a debugger's key
/// against.  All ones means no key is set.
pub const READ_PROTECTED_KEY_HASH: [u32; 4] = [0xFFFF_FFFF; 4];

/// CRC-32/MPEG-2 of `READ_PROTECTED_KEY_HASH`, checked by the boot kernel
/// before it trusts the hash.
pub const READ_PROTECTED_KEY_CRC: u32 = 0xA79C_3203;

/// Number of flash pages the boot kernel CRC-checks before starting the
/// application.  Zero skips the check.
pub const CRC_PAGE_COUNT: u32 = 0;

/// Emits the flash words the ADuCM302x boot kernel reads: the read-protection
/// key hash, its CRC, and the CRC page count, each in the section the linker
/// script places after the vector table.
///
/// ```ignore
/// aducm::boot_metadata!();
/// ```
#[macro_export]
macro_rules! boot_metadata {
    () => {
        #[used]
        #[cfg_attr(target_os = "none", link_section = "ReadProtectedKeyHash")]
        pub static READ_PROTECTED_KEY_HASH: [u32; 4] =
            $crate::aducm302x::boot::READ_PROTECTED_KEY_HASH;

        #[used]
        #[cfg_attr(target_os = "none", link_section = "CRC_ReadProtectedKeyHash")]
        pub static READ_PROTECTED_KEY_CRC: u32 =
            $crate::aducm302x::boot::READ_PROTECTED_KEY_CRC;

        #[used]
        #[cfg_attr(target_os = "none", link_section = "NumCRCPages")]
        pub static CRC_PAGE_COUNT: u32 = $crate::aducm302x::boot::CRC_PAGE_COUNT;
    };
}

/// The parts of the machine `reset_sequence` drives.
pub trait BootHardware {
    fn pmg(&self) -> &Pmg;

    fn cache(&self) -> &Cache;

    /// Copies the vector table into its SRAM slot.
    ///
    /// # Safety
    ///
    /// Only for use during reset, before anything dispatches through the copy.
    unsafe fn relocate_vectors(&mut self);

    /// Copies `.data` from its load image and zeroes `.bss`.
    ///
    /// # Safety
    ///
    /// Overwrites every static in RAM.
    unsafe fn init_segments(&mut self);

    /// Runs the application.  Normally doesn't return.
    ///
    /// # Safety
    ///
    /// Segments must be initialized.
    unsafe fn enter(&mut self);

    fn halt(&mut self) -> !;
}

/// Brings the machine from reset to the application, per `config`.
///
/// # Safety
///
/// Must run exactly once, straight out of reset, with interrupts disabled in
/// the NVIC (as they are at reset).
pub unsafe fn reset_sequence<H: BootHardware>(hw: &mut H, config: &BootConfig) -> ! {
    let pmg = hw.pmg();
    pmg.unlock();
    pmg.clear_retention();
    pmg.set_retention(SramBank::Bank1, true);

    if config.disable_isram {
        // The cache is off out of reset, and only turned on below, so this
        // can't be refused.
        let _ = pmg.set_instruction_sram(false, hw.cache());
    }

    if config.enable_icache {
        hw.cache().set_instruction_cache(true);
    }

    if config.relocate_vectors {
        hw.relocate_vectors();
    }

    hw.init_segments();
    hw.enter();
    hw.halt()
}

#[cfg(target_os = "none")]
mod target {
    use super::*;
    use crate::aducm302x::cache::CACHE;
    use crate::aducm302x::pmg::PMG0;
    use crate::aducm302x::vectors::VectorTable;
    use crate::arm_m::startup;

    #[cfg(feature = "relocate-ivt")]
    use crate::aducm302x::vectors::{RelocatedTable, RelocatedVectors};

    extern "C" {
        /// The application's vector table, placed in `.isr_vector`.
        static __vector_table: VectorTable;

        /// Load image of `.data` in flash.
        static _etext: u32;
        static mut _data: u32;
        static mut _edata: u32;
        static mut _bss: u32;
        static mut _ebss: u32;

        /// Defined by `aducm::entry!`.
        fn aducm_main();
    }

    /// SRAM copy of the vector table.  The linker script places
    /// `.relocated_ivt` at `RELOCATION_ADDRESS` and marks it `NOLOAD`.
    #[cfg(feature = "relocate-ivt")]
    #[link_section = ".relocated_ivt"]
    #[used]
    static RELOCATED_VECTORS: RelocatedTable = RelocatedTable::new();

    /// The vector table copy made during reset.
    #[cfg(feature = "relocate-ivt")]
    pub fn relocated_vectors() -> RelocatedVectors<'static> {
        // Reset always populates the copy before the application runs.
        unsafe { RELOCATED_VECTORS.assume_populated() }
    }

    struct Aducm302x;

    impl BootHardware for Aducm302x {
        fn pmg(&self) -> &Pmg {
            &PMG0
        }

        fn cache(&self) -> &Cache {
            &CACHE
        }

        unsafe fn relocate_vectors(&mut self) {
            #[cfg(feature = "relocate-ivt")]
            {
                let _ = RELOCATED_VECTORS.populate(&*core::ptr::addr_of!(__vector_table));
            }
        }

        unsafe fn init_segments(&mut self) {
            startup::copy_data(core::ptr::addr_of!(_etext),
                               core::ptr::addr_of_mut!(_data),
                               core::ptr::addr_of_mut!(_edata));
            startup::zero_bss(core::ptr::addr_of_mut!(_bss),
                              core::ptr::addr_of_mut!(_ebss));
        }

        unsafe fn enter(&mut self) {
            aducm_main()
        }

        fn halt(&mut self) -> ! {
            startup::halt()
        }
    }

    /// The reset vector.  Put this in the `reset` slot of `__vector_table`.
    #[unsafe(naked)]
    pub unsafe extern "C" fn aducm_reset_vector() -> ! {
        core::arch::naked_asm!(
            "ldr r0, ={table}",
            "ldr r0, [r0]",
            "msr msp, r0",
            "b {start}",
            table = sym __vector_table,
            start = sym reset_start,
        )
    }

    unsafe extern "C" fn reset_start() -> ! {
        reset_sequence(&mut Aducm302x, &BOOT_CONFIG)
    }
}

#[cfg(target_os = "none")]
pub use self::target::aducm_reset_vector;

#[cfg(all(target_os = "none", feature = "relocate-ivt"))]
pub use self::target::relocated_vectors;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aducm302x::irq::Interrupt;
    use crate::aducm302x::vectors::{RelocatedTable, VectorTable, VectorTableBuilder,
                                    VECTOR_COUNT};
    use crate::aducm302x::{cache, pmg};
    use proptest::prelude::*;
    use std::panic::{self, AssertUnwindSafe};

    /// Unwound with when the simulated board halts.
    struct Halted;

    unsafe extern "C" fn no_reset() -> ! {
        crate::arm_m::startup::halt()
    }

    crate::isr! {
        fn rtc_tick() {}
    }

    static STACK_TOP: u32 = 0;

    struct SimBoard {
        pmg_regs: Box<pmg::Registers>,
        _cache_regs: Box<cache::Registers>,
        pmg: Pmg,
        cache: Cache,
        table: VectorTable,
        relocated: Box<RelocatedTable>,
        image: Vec<u32>,
        data: Vec<u32>,
        bss: Vec<u32>,
        trace: Vec<&'static str>,
        segments_ready_at_entry: bool,
    }

    impl SimBoard {
        fn new(image: Vec<u32>, bss_garbage: Vec<u32>) -> SimBoard {
            let pmg_regs = Box::new(pmg::Registers::zeroed());
            let cache_regs = Box::new(cache::Registers::zeroed());
            let pmg = Pmg::at(&*pmg_regs);
            let cache = Cache::at(&*cache_regs);
            let data = vec![0xDEAD_BEEF; image.len()];
            SimBoard {
                pmg_regs,
                _cache_regs: cache_regs,
                pmg,
                cache,
                table: VectorTableBuilder::new(&STACK_TOP, no_reset)
                    .interrupt(Interrupt::Rtc1, rtc_tick)
                    .build(),
                relocated: Box::new(RelocatedTable::new()),
                image,
                data,
                bss: bss_garbage,
                trace: Vec::new(),
                segments_ready_at_entry: false,
            }
        }

        fn boot(&mut self, config: BootConfig) {
            let r = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
                reset_sequence(self, &config)
            }));
            match r {
                Err(payload) => assert!(payload.downcast_ref::<Halted>().is_some()),
                Ok(_) => panic!("reset sequence returned"),
            }
        }
    }

    impl BootHardware for SimBoard {
        fn pmg(&self) -> &Pmg {
            &self.pmg
        }

        fn cache(&self) -> &Cache {
            &self.cache
        }

        unsafe fn relocate_vectors(&mut self) {
            self.trace.push("relocate");
            let _ = self.relocated.populate(&self.table);
        }

        unsafe fn init_segments(&mut self) {
            self.trace.push("segments");
            let d = self.data.as_mut_ptr();
            crate::arm_m::startup::copy_data(self.image.as_ptr(), d, d.add(self.data.len()));
            let b = self.bss.as_mut_ptr();
            crate::arm_m::startup::zero_bss(b, b.add(self.bss.len()));
        }

        unsafe fn enter(&mut self) {
            self.trace.push("enter");
            self.segments_ready_at_entry =
                self.data == self.image && self.bss.iter().all(|&w| w == 0);
        }

        fn halt(&mut self) -> ! {
            self.trace.push("halt");
            panic::resume_unwind(Box::new(Halted))
        }
    }

    mod metadata {
        crate::boot_metadata!();
    }

    /// CRC-32/MPEG-2: polynomial 0x04C11DB7, MSB first, initial value all
    /// ones, no final XOR.
    fn crc32_mpeg2(bytes: &[u8]) -> u32 {
        let mut crc = !0u32;
        for &b in bytes {
            crc ^= u32::from(b) << 24;
            for _ in 0..8 {
                crc = if crc & 0x8000_0000 != 0 {
                    (crc << 1) ^ 0x04C1_1DB7
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    #[test]
    fn boot_metadata_words() {
        assert_eq!(metadata::READ_PROTECTED_KEY_HASH, [0xFFFF_FFFF; 4]);
        assert_eq!(metadata::READ_PROTECTED_KEY_CRC, 0xA79C_3203);
        assert_eq!(metadata::CRC_PAGE_COUNT, 0);
    }

    #[test]
    fn key_crc_matches_hash() {
        let bytes: Vec<u8> = READ_PROTECTED_KEY_HASH.iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        assert_eq!(crc32_mpeg2(&bytes), READ_PROTECTED_KEY_CRC);
    }

    #[test]
    fn default_config_follows_features() {
        assert_eq!(BOOT_CONFIG.relocate_vectors, cfg!(feature = "relocate-ivt"));
        assert_eq!(BOOT_CONFIG.enable_icache, cfg!(feature = "icache"));
        assert_eq!(BOOT_CONFIG.disable_isram, cfg!(feature = "disable-isram"));
    }

    #[test]
    fn retention_is_bank1_only() {
        let mut board = SimBoard::new(vec![1, 2, 3], vec![7; 4]);
        board.pmg_regs.sramret_set(0b11);
        board.boot(BootConfig::default());
        assert_eq!(board.pmg_regs.sramret(), 0b01);
        assert_eq!(board.pmg_regs.pwrkey(), 0xF27B);
    }

    #[test]
    fn full_configuration() {
        let mut board = SimBoard::new(vec![10, 20], vec![1, 2, 3]);
        board.pmg_regs.tst_sram_ctl_set(1 << 31);
        board.boot(BootConfig {
            disable_isram: true,
            enable_icache: true,
            relocate_vectors: true,
        });

        assert_eq!(board.trace, ["relocate", "segments", "enter", "halt"]);
        assert_eq!(board.pmg_regs.tst_sram_ctl(), 0);
        assert!(board.cache.instruction_cache_enabled());
        assert!(board.segments_ready_at_entry);

        let copy = unsafe { board.relocated.assume_populated() };
        assert_eq!(copy.base() % crate::aducm302x::vectors::RELOCATION_SIZE, 0);
        for i in 0..VECTOR_COUNT {
            assert_eq!(copy.word(i), board.table.words()[i], "slot {}", i);
        }
        assert_eq!(copy.word(Interrupt::Rtc1.slot()), rtc_tick as usize);
    }

    #[test]
    fn features_off_leave_isram_and_cache_alone() {
        let mut board = SimBoard::new(vec![], vec![]);
        board.pmg_regs.tst_sram_ctl_set(1 << 31);
        board.boot(BootConfig::default());
        assert_eq!(board.trace, ["segments", "enter", "halt"]);
        assert_eq!(board.pmg_regs.tst_sram_ctl(), 1 << 31);
        assert!(!board.cache.instruction_cache_enabled());
    }

    proptest! {
        #[test]
        fn steps_run_once_in_order(
            disable_isram: bool,
            enable_icache: bool,
            relocate_vectors: bool,
            image in proptest::collection::vec(any::<u32>(), 0..32),
            bss in proptest::collection::vec(any::<u32>(), 0..32),
        ) {
            let mut board = SimBoard::new(image, bss);
            board.boot(BootConfig { disable_isram, enable_icache, relocate_vectors });

            let mut expected = Vec::new();
            if relocate_vectors {
                expected.push("relocate");
            }
            expected.extend(["segments", "enter", "halt"]);
            prop_assert_eq!(&board.trace, &expected);
            prop_assert!(board.segments_ready_at_entry);
            prop_assert_eq!(board.cache.instruction_cache_enabled(), enable_icache);
        }
    }
}
