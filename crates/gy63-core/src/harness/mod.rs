//! Reference host for tests and the desktop simulator.
//!
//! [`Simulation`] keeps a [`SimHost`] and the chip it created side by side and
//! plays the role of the bus controller: it turns byte-level requests into the
//! callback sequence a real simulation host would deliver.

mod host;

pub use host::*;

use alloc::vec::Vec;

use embassy_time::Duration;
use embedded_hal::digital::PinState;

use crate::chip::{Chip, ChipError};
use crate::config::ChipConfig;
use crate::host::{I2cTarget, PinWatcher, SpiTarget, TimerTarget};
use crate::protocol::CHIP_SELECT_PIN;

pub struct Simulation {
    host: SimHost,
    chip: Chip<SimHost>,
    completions: u32,
}

impl Simulation {
    /// Creates the stock chip on `host`.
    pub fn new(host: SimHost) -> Result<Self, ChipError> {
        Self::with_config(host, &ChipConfig::default())
    }

    pub fn with_config(mut host: SimHost, config: &ChipConfig) -> Result<Self, ChipError> {
        let chip = Chip::with_config(&mut host, config)?;
        Ok(Self {
            host,
            chip,
            completions: 0,
        })
    }

    pub fn host(&self) -> &SimHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut SimHost {
        &mut self.host
    }

    pub fn chip(&self) -> &Chip<SimHost> {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut Chip<SimHost> {
        &mut self.chip
    }

    /// SPI completions delivered so far, including aborts.
    pub fn completions(&self) -> u32 {
        self.completions
    }

    /// One write transaction. Returns `false` on NACK or when no I2C target is
    /// registered.
    pub fn i2c_write(&mut self, bytes: &[u8]) -> bool {
        let Some(address) = self.host.i2c_config().map(|config| config.address) else {
            return false;
        };
        if !self.chip.connect(address, false) {
            return false;
        }

        let acked = bytes.iter().all(|&byte| self.chip.write(byte));
        self.chip.disconnect();
        acked
    }

    /// One read transaction filling `buffer`.
    pub fn i2c_read(&mut self, buffer: &mut [u8]) -> bool {
        let Some(address) = self.host.i2c_config().map(|config| config.address) else {
            return false;
        };
        if !self.chip.connect(address, true) {
            return false;
        }

        for byte in buffer.iter_mut() {
            *byte = self.chip.read();
        }
        self.chip.disconnect();
        true
    }

    /// Selects `register`, then reads `buffer.len()` consecutive registers.
    pub fn i2c_write_read(&mut self, register: u8, buffer: &mut [u8]) -> bool {
        self.i2c_write(&[register]) && self.i2c_read(buffer)
    }

    /// Drives a named pin, delivering the watch callback and any abort it causes.
    pub fn set_pin(&mut self, name: &str, level: PinState) -> bool {
        let Some(change) = self.host.drive_pin(name, level) else {
            return false;
        };

        if change.notify {
            self.chip.pin_change(&mut self.host, change.pin, level);
        }
        if self.host.take_abort() {
            self.completions += 1;
            self.chip.spi_done(&mut self.host, &[]);
        }
        true
    }

    pub fn set_chip_select(&mut self, level: PinState) -> bool {
        self.set_pin(CHIP_SELECT_PIN, level)
    }

    /// Clocks one byte through the in-flight exchange.
    ///
    /// Returns the byte the chip shifted out, or `None` when no exchange is
    /// running (chip deselected or SPI not in use).
    pub fn spi_exchange(&mut self, mosi: u8) -> Option<u8> {
        let outgoing = self.host.take_transfer()?;
        let &miso = outgoing.first()?;

        self.completions += 1;
        self.chip.spi_done(&mut self.host, &[mosi]);
        Some(miso)
    }

    /// Clocks `bytes` one at a time, stopping early if the exchange ends.
    pub fn spi_transfer(&mut self, bytes: &[u8]) -> Vec<u8> {
        bytes
            .iter()
            .map_while(|&byte| self.spi_exchange(byte))
            .collect()
    }

    /// Advances virtual time and delivers the timer ticks that fall in it.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        let fired = self.host.advance_timer(self.chip.timer(), dt);
        for _ in 0..fired {
            self.chip.timer_fired();
        }
        fired
    }
}
