//! Construction parameters for the chip.
//!
//! A host can build a [`ChipConfig`] in code or hand the chip a postcard blob it
//! stored earlier. Both paths are validated before the chip starts.

use alloc::string::String;
use alloc::vec::Vec;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::chip::ChipError;
use crate::sampling::{NOISE_BASE, NOISE_SPAN, REFRESH_PERIOD_US};
use crate::telemetry::{PRESSURE_ATTRIBUTE, PRESSURE_INITIAL};

/// Construction parameters for a [`Chip`](crate::chip::Chip).
///
/// The default reproduces the stock chip: 100 ms refresh, temperature LSB
/// noise in `75..=149`, and a `barometricPressure` attribute starting at 1000.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChipConfig {
    /// Sample refresh period in microseconds
    pub refresh_period_us: u64,
    /// Lowest value the refresh writes
    pub noise_base: u8,
    /// Number of distinct values the refresh writes
    pub noise_span: u8,
    /// Fixed RNG seed; `None` uses the built-in seed
    pub seed: Option<u64>,
    pub pressure_attribute: String,
    pub pressure_initial: f32,
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            refresh_period_us: REFRESH_PERIOD_US,
            noise_base: NOISE_BASE,
            noise_span: NOISE_SPAN,
            seed: None,
            pressure_attribute: String::from(PRESSURE_ATTRIBUTE),
            pressure_initial: PRESSURE_INITIAL,
        }
    }
}

impl ChipConfig {
    pub fn refresh_period(&self) -> Duration {
        Duration::from_micros(self.refresh_period_us)
    }

    /// Rejects settings the chip cannot run with.
    pub fn validate(&self) -> Result<(), ChipError> {
        if self.refresh_period_us == 0 {
            return Err(ChipError::InvalidConfig("refresh period must be non-zero"));
        }
        if self.noise_span == 0 {
            return Err(ChipError::InvalidConfig("noise span must be non-zero"));
        }
        if self.noise_base as u16 + self.noise_span as u16 > 256 {
            return Err(ChipError::InvalidConfig("noise range exceeds one byte"));
        }
        if self.pressure_attribute.is_empty() {
            return Err(ChipError::InvalidConfig("attribute name must not be empty"));
        }
        Ok(())
    }

    /// Decodes and validates a stored configuration blob.
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ChipError> {
        let config: Self = postcard::from_bytes(bytes).map_err(ChipError::Config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_postcard(&self) -> Result<Vec<u8>, ChipError> {
        postcard::to_allocvec(self).map_err(ChipError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_stock_chip() {
        let config = ChipConfig::default();
        assert_eq!(config.refresh_period(), Duration::from_millis(100));
        assert_eq!(config.noise_base, 75);
        assert_eq!(config.noise_span, 75);
        assert_eq!(config.pressure_attribute, "barometricPressure");
        assert_eq!(config.pressure_initial, 1000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_postcard_blob() {
        let config = ChipConfig {
            seed: Some(42),
            refresh_period_us: 250_000,
            ..ChipConfig::default()
        };
        let bytes = config.to_postcard().unwrap();
        assert_eq!(ChipConfig::from_postcard(&bytes).unwrap(), config);
    }

    #[test]
    fn test_rejects_zero_span() {
        let config = ChipConfig {
            noise_span: 0,
            ..ChipConfig::default()
        };
        assert!(matches!(config.validate(), Err(ChipError::InvalidConfig(_))));

        let bytes = config.to_postcard().unwrap();
        assert!(matches!(
            ChipConfig::from_postcard(&bytes),
            Err(ChipError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_overflowing_range() {
        let config = ChipConfig {
            noise_base: 200,
            noise_span: 57,
            ..ChipConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_truncated_blob() {
        let bytes = ChipConfig::default().to_postcard().unwrap();
        assert!(matches!(
            ChipConfig::from_postcard(&bytes[..2]),
            Err(ChipError::Config(_))
        ));
    }
}
