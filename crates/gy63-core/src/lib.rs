//! Hardware-independent model of the GY-63 barometric pressure breakout (BMP280)
//!
//! This crate contains the chip side of a simulated sensor: the 256-byte
//! register file, power-up protocol selection, the I2C and SPI target state
//! machines, the background sample refresh and the telemetry attribute. The
//! simulation host plugs in through the [`host::Host`] trait.
//!
//! It is `#![no_std]` with `extern crate alloc` so it can be embedded in any
//! host, and it compiles on desktop for the simulator and tests.

#![no_std]

extern crate alloc;

pub mod calibration;
pub mod chip;
pub mod config;
pub mod harness;
pub mod host;
pub mod i2c;
pub mod protocol;
pub mod registers;
pub mod sampling;
pub mod settings;
pub mod spi;
pub mod telemetry;

pub use chip::{Chip, ChipError};
pub use config::ChipConfig;
pub use embassy_time::Duration;
pub use protocol::Protocol;
