//! Support for the Analog Devices ADuCM302x (ADuCM3027/3029) SoCs.

pub mod irq;

pub mod boot;
pub mod cache;
pub mod gpio;
pub mod pmg;
pub mod vectors;
