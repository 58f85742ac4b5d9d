//! Read-only views of the calibration block and the raw measurement registers.
//!
//! The chip model never compensates readings; these decoders exist so a host
//! can inspect what a driver will see on the bus.

use crate::registers::{Register, RegisterFile};

const CALIBRATION_LEN: usize = 24;

/// Factory trimming coefficients (dig_T* and dig_P*).
///
/// Stored little-endian in registers 0x88..=0x9F. T1 and P1 are unsigned, the
/// rest are two's complement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

impl Calibration {
    /// Size of the calibration block in bytes.
    pub const LEN: usize = CALIBRATION_LEN;

    /// Decodes the calibration block from its raw bytes.
    pub fn from_bytes(buffer: &[u8; CALIBRATION_LEN]) -> Self {
        let unsigned = |i: usize| u16::from_le_bytes([buffer[i], buffer[i + 1]]);
        let signed = |i: usize| i16::from_le_bytes([buffer[i], buffer[i + 1]]);

        Self {
            dig_t1: unsigned(0),
            dig_t2: signed(2),
            dig_t3: signed(4),
            dig_p1: unsigned(6),
            dig_p2: signed(8),
            dig_p3: signed(10),
            dig_p4: signed(12),
            dig_p5: signed(14),
            dig_p6: signed(16),
            dig_p7: signed(18),
            dig_p8: signed(20),
            dig_p9: signed(22),
        }
    }

    /// Decodes the calibration block currently held by the register file.
    pub fn from_registers(regs: &RegisterFile) -> Self {
        Self::from_bytes(&regs.read_block::<CALIBRATION_LEN>(Register::CALIBRATION_START.addr()))
    }
}

/// Uncompensated 20-bit ADC outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMeasurement {
    pub adc_p: u32,
    pub adc_t: u32,
}

impl RawMeasurement {
    /// Assembles msb/lsb/xlsb into a 20-bit value (xlsb carries bits 7:4).
    const fn assemble(block: [u8; 3]) -> u32 {
        ((block[0] as u32) << 12) | ((block[1] as u32) << 4) | ((block[2] as u32) >> 4)
    }

    /// Decodes the pressure and temperature blocks (0xF7..=0xFC).
    pub fn from_registers(regs: &RegisterFile) -> Self {
        Self {
            adc_p: Self::assemble(regs.read_block::<3>(Register::PRESSURE_DATA.addr())),
            adc_t: Self::assemble(regs.read_block::<3>(Register::TEMPERATURE_DATA.addr())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasheet_calibration() {
        let calib = Calibration::from_registers(&RegisterFile::new());
        assert_eq!(calib.dig_t1, 27504);
        assert_eq!(calib.dig_t2, 26435);
        assert_eq!(calib.dig_t3, -1000);
        assert_eq!(calib.dig_p1, 36477);
        assert_eq!(calib.dig_p2, -10685);
        assert_eq!(calib.dig_p3, 3024);
        assert_eq!(calib.dig_p4, 2855);
        assert_eq!(calib.dig_p5, 140);
        assert_eq!(calib.dig_p6, -7);
        assert_eq!(calib.dig_p7, 15500);
        assert_eq!(calib.dig_p8, -14600);
        assert_eq!(calib.dig_p9, 6000);
    }

    #[test]
    fn test_datasheet_raw_measurement() {
        let raw = RawMeasurement::from_registers(&RegisterFile::new());
        assert_eq!(raw.adc_p, (0x65 << 12) | (0x90 << 4) | (0xC0 >> 4));
        assert_eq!(raw.adc_p, 416012);
        assert_eq!(raw.adc_t, 519888);
    }

    #[test]
    fn test_raw_measurement_tracks_register_writes() {
        let mut regs = RegisterFile::new();
        regs[Register::TempLsb] = 0x00;
        regs[Register::TempXlsb] = 0xF0;
        let raw = RawMeasurement::from_registers(&regs);
        assert_eq!(raw.adc_t, (0x7E << 12) | 0x0F);
    }
}
