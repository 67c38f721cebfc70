//! Rust runtime startup support for ARMv7-M bare metal targets.
//!
//! The SoC layer owns the reset sequence itself (see
//! `aducm302x::boot`); this module holds the architecture-level pieces it is
//! built from.  Define your application entry point with `entry!`:
//!
//! ```ignore
//! aducm::entry!(app);
//!
//! fn app() -> ! {
//!     // code here
//!     loop {}
//! }
//! ```
//!
//! Everything here may run before `.data` and `.bss` hold their proper
//! contents, so none of it touches a `static` in RAM.

use core::ptr;

/// Copies the initialized-data image starting at `image` into the words
/// `start..end`.
///
/// # Safety
///
/// `start..end` must be writable, word-aligned and not overlap the image, and
/// the image must be at least as long as the destination.
pub unsafe fn copy_data(mut image: *const u32, mut start: *mut u32, end: *mut u32) {
    while start < end {
        ptr::write_volatile(start, ptr::read_volatile(image));
        start = start.add(1);
        image = image.add(1);
    }
}

/// Zeroes the words `start..end`.
///
/// # Safety
///
/// `start..end` must be writable and word-aligned.
pub unsafe fn zero_bss(mut start: *mut u32, end: *mut u32) {
    while start < end {
        ptr::write_volatile(start, 0);
        start = start.add(1);
    }
}

/// Parks the processor.  Used when there is no valid next instruction: a
/// fault nobody handles, or an application entry point that returned.
#[inline(never)]
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop()
    }
}

/// Exports `$path` as the application entry point called at the end of
/// reset.  `$path` must be a `fn() -> !`; anything else fails to compile.
#[macro_export]
macro_rules! entry {
    ($path:path) => {
        #[export_name = "aducm_main"]
        pub unsafe extern "C" fn __aducm_main() {
            let entry: fn() -> ! = $path;
            entry()
        }
    };
}
