//! Reset, vector table and driver support for the Analog Devices ADuCM302x
//! family of Cortex-M3 microcontrollers.
//!
//! `arm_m` covers what every ARMv7-M part shares; `aducm302x` builds the
//! SoC-specific pieces on top of it.

#![cfg_attr(not(test), no_std)]

#![deny(
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    )]

#[macro_use]
pub mod bits;

pub mod aducm302x;
pub mod arm_m;

mod lang;
