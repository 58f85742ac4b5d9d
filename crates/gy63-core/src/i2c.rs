//! Two-wire (I2C) target state machine.
//!
//! A driver selects a register by writing its address, then either writes data
//! bytes to it or reads consecutive registers back. Only the addresses in
//! [`Register::SELECTABLE`] move the cursor; every other written byte is stored
//! at the current cursor, including the first byte of a transaction. The cursor
//! survives across transactions.

use log::debug;

use crate::registers::{Register, RegisterFile};
use crate::settings::MeasurementSettings;

/// Address used when the CSB strap is low.
pub const PRIMARY_ADDRESS: u8 = 0x77;

/// Address used when the CSB strap is high.
pub const ALTERNATE_ADDRESS: u8 = 0x76;

/// Phase of the current bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Reading,
    Writing,
}

#[derive(Debug, Clone)]
pub struct TwoWireBus {
    address: u8,
    cursor: u8,
    state: TransferState,
}

impl TwoWireBus {
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            cursor: 0,
            state: TransferState::Idle,
        }
    }

    /// Address the chip answers on.
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Register the next read or data write targets.
    pub const fn cursor(&self) -> u8 {
        self.cursor
    }

    pub const fn state(&self) -> TransferState {
        self.state
    }

    /// Always ACKs; the host only routes transactions for our address.
    pub fn connect(&mut self, address: u8, read: bool) -> bool {
        self.state = if read {
            TransferState::Reading
        } else {
            TransferState::Writing
        };
        debug!("I2C connect {:#04x} ({})", address, if read { "read" } else { "write" });
        true
    }

    /// Handles one byte from the controller. Always ACKs.
    pub fn write(&mut self, regs: &mut RegisterFile, data: u8) -> bool {
        match Register::selectable(data) {
            Some(register) => {
                debug!("{}", register.label());
                self.cursor = register.addr();
            }
            None => {
                regs.write(self.cursor, data);
                debug!("Address: {:x}, Data: {:x}", self.cursor, regs.read(self.cursor));

                if self.cursor == Register::CtrlMeas.addr() || self.cursor == Register::Config.addr()
                {
                    debug!("Settings: {:?}", MeasurementSettings::from_registers(regs));
                }
            }
        }
        true
    }

    /// Returns the byte under the cursor and advances it, wrapping after 0xFF.
    pub fn read(&mut self, regs: &RegisterFile) -> u8 {
        let addr = self.cursor;
        let value = regs.read(addr);
        self.cursor = addr.wrapping_add(1);
        debug!("Address: {:x}, Data: {:x}", addr, value);
        value
    }

    /// Ends the transaction. The cursor is kept.
    pub fn disconnect(&mut self) {
        self.state = TransferState::Idle;
    }
}
