//! Background refresh of the measurement registers.
//!
//! On every timer tick the temperature LSB is replaced with a value drawn
//! uniformly from `base..base + span`, so a driver polling the chip sees a
//! reading that moves like a noisy live sensor. Only the range is contractual;
//! the sequence depends on the seed.

use core::ops::RangeInclusive;

use log::trace;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::registers::{Register, RegisterFile};

/// Register rewritten on each tick.
pub const REFRESH_TARGET: Register = Register::TempLsb;

/// Lowest value written by default.
pub const NOISE_BASE: u8 = 75;

/// Number of distinct values written by default.
pub const NOISE_SPAN: u8 = 75;

/// Refresh period in microseconds.
pub const REFRESH_PERIOD_US: u64 = 100_000;

/// Seed used when the configuration does not provide one.
pub const DEFAULT_SEED: u64 = 0x6763_3633_6270_3238;

pub struct SampleRefresh {
    rng: SmallRng,
    base: u8,
    span: u8,
    ticks: u64,
}

impl SampleRefresh {
    /// `span` must be non-zero and `base + span` must not exceed 256.
    pub(crate) fn new(base: u8, span: u8, seed: u64) -> Self {
        debug_assert!(span > 0 && base as u16 + span as u16 <= 256);
        Self {
            rng: SmallRng::seed_from_u64(seed),
            base,
            span,
            ticks: 0,
        }
    }

    /// Values a tick can produce.
    pub fn range(&self) -> RangeInclusive<u8> {
        self.base..=self.base + (self.span - 1)
    }

    /// Number of ticks handled so far.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Overwrites [`REFRESH_TARGET`] and returns the written value.
    pub fn tick(&mut self, regs: &mut RegisterFile) -> u8 {
        let value = self.base + self.rng.gen_range(0..self.span);
        regs[REFRESH_TARGET] = value;
        self.ticks += 1;
        trace!("Sample refresh #{}: {:#04x}", self.ticks, value);
        value
    }
}

impl Default for SampleRefresh {
    fn default() -> Self {
        Self::new(NOISE_BASE, NOISE_SPAN, DEFAULT_SEED)
    }
}
