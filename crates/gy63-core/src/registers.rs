//! BMP280 register map and the chip's 256-byte register file.
//!
//! Addresses follow the Bosch BMP280 datasheet. The initial contents are the
//! example trimming and measurement values printed in the datasheet, so a driver
//! talking to a fresh chip sees a plausible, known sensor.

use core::ops::{Index, IndexMut};

/// Identification byte returned from [`Register::ChipId`].
pub const CHIP_ID: u8 = 0x58;

/// Value a driver writes to [`Register::SoftReset`] to request a power-on reset.
///
/// The model stores the byte like any other data write; no reset is performed.
pub const RESET_CODE: u8 = 0xB6;

/// Number of addressable registers.
pub const REGISTER_COUNT: usize = 256;

/// Named BMP280 register addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    DigT1 = 0x88,
    DigT2 = 0x8A,
    DigT3 = 0x8C,
    DigP1 = 0x8E,
    DigP2 = 0x90,
    DigP3 = 0x92,
    DigP4 = 0x94,
    DigP5 = 0x96,
    DigP6 = 0x98,
    DigP7 = 0x9A,
    DigP8 = 0x9C,
    DigP9 = 0x9E,
    ChipId = 0xD0,
    Version = 0xD1,
    SoftReset = 0xE0,
    // bit 3 - measuring, bit 0 - im_update
    Status = 0xF3,
    CtrlMeas = 0xF4,
    Config = 0xF5,
    PressMsb = 0xF7,
    PressLsb = 0xF8,
    PressXlsb = 0xF9,
    TempMsb = 0xFA,
    TempLsb = 0xFB,
    TempXlsb = 0xFC,
}

impl Register {
    /// Start of the 24-byte calibration block.
    pub const CALIBRATION_START: Self = Self::DigT1;
    /// Start of the 3-byte pressure reading.
    pub const PRESSURE_DATA: Self = Self::PressMsb;
    /// Start of the 3-byte temperature reading.
    pub const TEMPERATURE_DATA: Self = Self::TempMsb;

    /// Register addresses that move the two-wire address cursor when written.
    ///
    /// Any other byte written over the bus is stored as data.
    pub const SELECTABLE: [Self; 7] = [
        Self::SoftReset,
        Self::CALIBRATION_START,
        Self::Config,
        Self::CtrlMeas,
        Self::Status,
        Self::PRESSURE_DATA,
        Self::TEMPERATURE_DATA,
    ];

    /// Register address on the bus.
    #[inline]
    pub const fn addr(self) -> u8 {
        self as u8
    }

    /// Returns the selectable register matching a written byte, if any.
    pub fn selectable(byte: u8) -> Option<Self> {
        Self::SELECTABLE
            .iter()
            .copied()
            .find(|register| register.addr() == byte)
    }

    /// Short label used in diagnostic traces.
    pub const fn label(self) -> &'static str {
        match self {
            Self::SoftReset => "Reset",
            Self::DigT1 => "Params",
            Self::Config => "Config",
            Self::CtrlMeas => "Control",
            Self::Status => "Status",
            Self::PressMsb => "Pressure Data",
            Self::TempMsb => "Temperature Data",
            Self::ChipId => "Chip ID",
            Self::Version => "Version",
            _ => "Register",
        }
    }
}

// Sample trimming values from the BMP280 datasheet, page 23.
const CALIBRATION_DEFAULTS: [(u8, u8); 24] = [
    (0x88, 0x70), // dig_T1 27504
    (0x89, 0x6B),
    (0x8A, 0x43), // dig_T2 26435
    (0x8B, 0x67),
    (0x8C, 0x18), // dig_T3 -1000
    (0x8D, 0xFC),
    (0x8E, 0x7D), // dig_P1 36477
    (0x8F, 0x8E),
    (0x90, 0x43), // dig_P2 -10685
    (0x91, 0xD6),
    (0x92, 0xD0), // dig_P3 3024
    (0x93, 0x0B),
    (0x94, 0x27), // dig_P4 2855
    (0x95, 0x0B),
    (0x96, 0x8C), // dig_P5 140
    (0x97, 0x00),
    (0x98, 0xF9), // dig_P6 -7
    (0x99, 0xFF),
    (0x9A, 0x8C), // dig_P7 15500
    (0x9B, 0x3C),
    (0x9C, 0xF8), // dig_P8 -14600
    (0x9D, 0xC6),
    (0x9E, 0x70), // dig_P9 6000
    (0x9F, 0x17),
];

// Sample measurement values from the same datasheet page.
const MEASUREMENT_DEFAULTS: [(Register, u8); 6] = [
    (Register::PressMsb, 0x65),
    (Register::PressLsb, 0x90),
    (Register::PressXlsb, 0xC0),
    (Register::TempMsb, 0x7E),
    (Register::TempLsb, 0xED),
    (Register::TempXlsb, 0x00),
];

/// The chip's complete byte-addressable register space.
///
/// Indexing takes a `u8`, so every address is in range by construction.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile {
    bytes: [u8; REGISTER_COUNT],
}

impl RegisterFile {
    /// Creates an all-zero register file.
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; REGISTER_COUNT],
        }
    }

    /// Creates a register file holding the power-on contents of the chip.
    pub fn new() -> Self {
        let mut file = Self::zeroed();
        file.load_defaults();
        file
    }

    /// Writes the power-on contents over the documented addresses.
    ///
    /// Addresses outside the documented layout are left untouched.
    pub fn load_defaults(&mut self) {
        for &(addr, value) in CALIBRATION_DEFAULTS.iter() {
            self.bytes[addr as usize] = value;
        }

        self[Register::ChipId] = CHIP_ID;
        self[Register::SoftReset] = 0x00;
        self[Register::Status] = 0x00;
        self[Register::CtrlMeas] = 0x00;
        self[Register::Config] = 0x00;

        for &(register, value) in MEASUREMENT_DEFAULTS.iter() {
            self[register] = value;
        }
    }

    /// Reads one register.
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.bytes[addr as usize]
    }

    /// Writes one register.
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        self.bytes[addr as usize] = value;
    }

    /// Copies `N` consecutive registers starting at `start`, wrapping past 0xFF.
    pub fn read_block<const N: usize>(&self, start: u8) -> [u8; N] {
        let mut out = [0u8; N];
        for (offset, byte) in out.iter_mut().enumerate() {
            *byte = self.read(start.wrapping_add(offset as u8));
        }
        out
    }

    /// Borrow the raw table.
    pub fn as_bytes(&self) -> &[u8; REGISTER_COUNT] {
        &self.bytes
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterFile")
            .field("chip_id", &self[Register::ChipId])
            .field("ctrl_meas", &self[Register::CtrlMeas])
            .field("config", &self[Register::Config])
            .field("press", &self.read_block::<3>(Register::PRESSURE_DATA.addr()))
            .field("temp", &self.read_block::<3>(Register::TEMPERATURE_DATA.addr()))
            .finish_non_exhaustive()
    }
}

impl Index<u8> for RegisterFile {
    type Output = u8;

    fn index(&self, addr: u8) -> &u8 {
        &self.bytes[addr as usize]
    }
}

impl IndexMut<u8> for RegisterFile {
    fn index_mut(&mut self, addr: u8) -> &mut u8 {
        &mut self.bytes[addr as usize]
    }
}

impl Index<Register> for RegisterFile {
    type Output = u8;

    fn index(&self, register: Register) -> &u8 {
        &self.bytes[register.addr() as usize]
    }
}

impl IndexMut<Register> for RegisterFile {
    fn index_mut(&mut self, register: Register) -> &mut u8 {
        &mut self.bytes[register.addr() as usize]
    }
}
