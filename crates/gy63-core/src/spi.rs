//! Four-wire (SPI) peripheral state machine.
//!
//! While chip select is held low the chip keeps a one-byte exchange running.
//! Each received byte is ROT13-transformed and clocked back out on the next
//! exchange, so a controller sees its previous byte echoed in rotated form.
//! This stream carries no sensor data.

use embedded_hal::digital::PinState;
use log::{info, trace};

use crate::host::Host;

/// Byte clocked out on the first exchange after chip select.
pub const SEED_BYTE: u8 = b' ';

/// Rotates ASCII letters by 13 places, preserving case. Other bytes pass through.
pub const fn rot13(value: u8) -> u8 {
    match value {
        b'A'..=b'Z' => (value - b'A' + 13) % 26 + b'A',
        b'a'..=b'z' => (value - b'a' + 13) % 26 + b'a',
        _ => value,
    }
}

pub struct FourWireBus<H: Host> {
    cs: H::Pin,
    spi: H::Spi,
    buffer: [u8; 1],
    selected: bool,
}

impl<H: Host> FourWireBus<H> {
    pub const fn new(cs: H::Pin, spi: H::Spi) -> Self {
        Self {
            cs,
            spi,
            buffer: [SEED_BYTE],
            selected: false,
        }
    }

    /// Pin watched for chip select.
    pub fn chip_select_pin(&self) -> H::Pin {
        self.cs
    }

    /// Whether chip select was last seen asserted (low) by an edge callback.
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Byte that will be clocked out on the next exchange.
    pub const fn pending_byte(&self) -> u8 {
        self.buffer[0]
    }

    /// Chip-select edge. Changes on any other pin are ignored.
    pub fn pin_change(&mut self, host: &mut H, pin: H::Pin, level: PinState) {
        if pin != self.cs {
            return;
        }

        match level {
            PinState::Low => {
                info!("SPI chip selected");
                self.selected = true;
                self.buffer[0] = SEED_BYTE;
                host.spi_start(self.spi, &self.buffer);
            }
            PinState::High => {
                info!("SPI chip deselected");
                self.selected = false;
                host.spi_stop(self.spi);
            }
        }
    }

    /// Exchange completion. An empty `received` means the exchange was stopped.
    ///
    /// The next exchange starts only while the chip-select pin reads low.
    pub fn transfer_done(&mut self, host: &mut H, received: &[u8]) {
        let Some(&byte) = received.first() else {
            trace!("SPI exchange stopped");
            return;
        };

        self.buffer[0] = rot13(byte);
        trace!("SPI received {:#04x}, next {:#04x}", byte, self.buffer[0]);

        if host.pin_read(self.cs) == PinState::Low {
            host.spi_start(self.spi, &self.buffer);
        }
    }
}
