//! Demonstration firmware: a vector table with the GPIO driver's handlers
//! bound, and an application that counts external interrupt 0.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod app {
    use core::sync::atomic::{AtomicU32, Ordering};

    use aducm::aducm302x::boot;
    use aducm::aducm302x::gpio::{self, Event, GpioIrq, GPIO};
    use aducm::aducm302x::irq::{Interrupt, NvicExt, Priority};
    use aducm::aducm302x::vectors::{VectorTable, VectorTableBuilder};
    use aducm::arm_m::{self, nvic::NVIC};

    extern "C" {
        /// Exported by the linker script: the initial stack pointer.
        static __STACK_BASE: u32;
    }

    /// The ROM vector table.  The linker script places `.isr_vector` at the
    /// start of flash and keeps everything reachable from it.
    #[export_name = "__vector_table"]
    #[link_section = ".isr_vector"]
    pub static ISR_VECTORS: VectorTable = gpio::bind_handlers(
        VectorTableBuilder::new(&raw const __STACK_BASE, boot::aducm_reset_vector)
    ).build();

    // Read-protection and CRC words for the boot kernel, after the table.
    aducm::boot_metadata!();

    static PRESSES: AtomicU32 = AtomicU32::new(0);

    fn on_press(_param: *mut (), event: Event) {
        if let Event::External(0) = event {
            PRESSES.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[cfg(feature = "relocate-ivt")]
    aducm::isr! {
        /// Replaces the GPIO driver's line 0 handler in the SRAM table.
        fn ext0_direct() {
            PRESSES.fetch_add(1, Ordering::Relaxed);
        }
    }

    aducm::entry!(app);

    /// Parks on a setup failure, leaving `error` for a debugger.
    #[inline(never)]
    fn fail<E: core::fmt::Debug>(error: E) -> ! {
        log::error!("setup failed: {:?}", error);
        arm_m::startup::halt()
    }

    fn app() -> ! {
        GPIO.init();
        if let Err(e) = GPIO.register_callback(GpioIrq::Ext0, on_press,
                                               core::ptr::null_mut()) {
            fail(e)
        }

        NVIC.set_priority(Interrupt::ExtInt0, Priority::P3);
        NVIC.enable_irq(Interrupt::ExtInt0);

        #[cfg(feature = "relocate-ivt")]
        {
            use aducm::aducm302x::vectors::TABLE_BYTES;

            let table = boot::relocated_vectors();
            if let Err(e) = arm_m::scb::SCB.set_vector_table(table.base(), TABLE_BYTES) {
                fail(e)
            }
            table.patch_interrupt_masked(&NVIC, Interrupt::ExtInt0, ext0_direct);
        }

        loop {
            arm_m::wait_for_interrupt();
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
