//! Decoded view of the acquisition settings a driver has written.
//!
//! Bit layouts (BMP280 datasheet section 4.3):
//!
//! | Register        | Bits 7:5 | Bits 4:2 | Bits 1:0            |
//! |-----------------|----------|----------|---------------------|
//! | ctrl_meas 0xF4  | osrs_t   | osrs_p   | mode                |
//! | config 0xF5     | t_sb     | filter   | bit 0: spi3w_en     |
//!
//! The model does not act on these settings; they are exposed so the host can
//! check what the driver configured.

use crate::registers::{Register, RegisterFile};

/// Oversampling factor for a single measurement channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    /// Measurement skipped, output held at 0x80000
    Skip,
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl From<u8> for Oversampling {
    /// Codes 101, 110 and 111 all select x16.
    fn from(field: u8) -> Self {
        match field & 0b111 {
            0b000 => Self::Skip,
            0b001 => Self::X1,
            0b010 => Self::X2,
            0b011 => Self::X4,
            0b100 => Self::X8,
            _ => Self::X16,
        }
    }
}

/// Power mode (ctrl_meas bits 1:0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    Sleep,
    Forced,
    Normal,
}

impl From<u8> for PowerMode {
    fn from(field: u8) -> Self {
        match field & 0b11 {
            0b00 => Self::Sleep,
            0b11 => Self::Normal,
            _ => Self::Forced,
        }
    }
}

/// IIR filter coefficient (config bits 4:2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IirFilter {
    Off,
    X2,
    X4,
    X8,
    X16,
}

impl From<u8> for IirFilter {
    fn from(field: u8) -> Self {
        match field & 0b111 {
            0b000 => Self::Off,
            0b001 => Self::X2,
            0b010 => Self::X4,
            0b011 => Self::X8,
            _ => Self::X16,
        }
    }
}

/// Inactive duration between measurements in normal mode (config bits 7:5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standby {
    Ms0_5,
    Ms62_5,
    Ms125,
    Ms250,
    Ms500,
    Ms1000,
    Ms2000,
    Ms4000,
}

impl Standby {
    /// Standby time in microseconds.
    pub const fn micros(self) -> u32 {
        match self {
            Self::Ms0_5 => 500,
            Self::Ms62_5 => 62_500,
            Self::Ms125 => 125_000,
            Self::Ms250 => 250_000,
            Self::Ms500 => 500_000,
            Self::Ms1000 => 1_000_000,
            Self::Ms2000 => 2_000_000,
            Self::Ms4000 => 4_000_000,
        }
    }
}

impl From<u8> for Standby {
    fn from(field: u8) -> Self {
        match field & 0b111 {
            0b000 => Self::Ms0_5,
            0b001 => Self::Ms62_5,
            0b010 => Self::Ms125,
            0b011 => Self::Ms250,
            0b100 => Self::Ms500,
            0b101 => Self::Ms1000,
            0b110 => Self::Ms2000,
            _ => Self::Ms4000,
        }
    }
}

/// Settings held in ctrl_meas and config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementSettings {
    pub temperature_oversampling: Oversampling,
    pub pressure_oversampling: Oversampling,
    pub mode: PowerMode,
    pub standby: Standby,
    pub filter: IirFilter,
    pub spi3w_enabled: bool,
}

impl MeasurementSettings {
    /// Decodes raw ctrl_meas and config bytes.
    pub fn decode(ctrl_meas: u8, config: u8) -> Self {
        Self {
            temperature_oversampling: Oversampling::from(ctrl_meas >> 5),
            pressure_oversampling: Oversampling::from(ctrl_meas >> 2),
            mode: PowerMode::from(ctrl_meas),
            standby: Standby::from(config >> 5),
            filter: IirFilter::from(config >> 2),
            spi3w_enabled: config & 0b1 != 0,
        }
    }

    pub fn from_registers(regs: &RegisterFile) -> Self {
        Self::decode(regs[Register::CtrlMeas], regs[Register::Config])
    }
}
