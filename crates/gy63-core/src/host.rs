//! Boundary between the chip model and the simulation host.
//!
//! The host owns the chip and provides the primitives it needs (pins, buses,
//! a timer and a telemetry attribute) through [`Host`]. In the other direction
//! the chip implements the callback traits ([`I2cTarget`], [`PinWatcher`],
//! [`SpiTarget`], [`TimerTarget`]) and the host invokes them one at a time as
//! bus events and timer ticks happen.
//!
//! Callbacks that have to reach back into the host (starting or stopping an
//! SPI exchange) receive it as `&mut H`, so the host keeps the chip and its own
//! state side by side rather than inside each other.

use embassy_time::Duration;
use embedded_hal::digital::PinState;
use embedded_hal::spi::Mode;
use thiserror_no_std::Error;

/// Input configuration of a host pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Floating input
    Input,
    /// Input that reads high unless driven low
    InputPullUp,
    /// Input that reads low unless driven high
    InputPullDown,
}

impl PinMode {
    /// Level the pin settles at when nothing drives it.
    pub const fn idle_level(self) -> PinState {
        match self {
            Self::InputPullUp => PinState::High,
            Self::Input | Self::InputPullDown => PinState::Low,
        }
    }
}

/// Transitions a pin watch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

impl Edge {
    /// Whether a change from `from` to `to` should be reported.
    pub fn matches(self, from: PinState, to: PinState) -> bool {
        match (from, to) {
            (PinState::Low, PinState::High) => matches!(self, Self::Rising | Self::Both),
            (PinState::High, PinState::Low) => matches!(self, Self::Falling | Self::Both),
            _ => false,
        }
    }
}

/// Two-wire (I2C) target registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cConfig<P> {
    /// 7-bit address the host routes transactions for
    pub address: u8,
    pub scl: P,
    pub sda: P,
}

/// Four-wire (SPI) peripheral registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig<P> {
    pub sck: P,
    pub mosi: P,
    pub miso: P,
    pub mode: Mode,
}

/// A host primitive could not be created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Pin {name} unavailable")]
    PinUnavailable { name: &'static str },

    #[error("{bus} bus unavailable")]
    BusUnavailable { bus: &'static str },

    #[error("Timer unavailable")]
    TimerUnavailable,

    #[error("Attribute unavailable")]
    AttributeUnavailable,
}

/// Primitives a simulation host provides to the chip.
pub trait Host {
    /// Handle to a created pin.
    type Pin: Copy + PartialEq + core::fmt::Debug;
    /// Handle to the SPI peripheral.
    type Spi: Copy;
    /// Handle to a timer.
    type Timer: Copy;
    /// Handle to a telemetry attribute.
    type Attribute: Copy;

    fn pin_init(&mut self, name: &'static str, mode: PinMode) -> Result<Self::Pin, HostError>;

    fn pin_read(&self, pin: Self::Pin) -> PinState;

    /// Deliver [`PinWatcher::pin_change`] for matching transitions of `pin`.
    fn pin_watch(&mut self, pin: Self::Pin, edge: Edge) -> Result<(), HostError>;

    /// Route two-wire transactions for `config.address` to the chip's [`I2cTarget`].
    fn i2c_init(&mut self, config: I2cConfig<Self::Pin>) -> Result<(), HostError>;

    /// Register the chip as an SPI peripheral; completions go to [`SpiTarget`].
    fn spi_init(&mut self, config: SpiConfig<Self::Pin>) -> Result<Self::Spi, HostError>;

    /// Begin exchanging `buffer.len()` bytes, clocking `buffer` out on MISO.
    fn spi_start(&mut self, spi: Self::Spi, buffer: &[u8]);

    /// Abort an in-flight exchange. The host reports it as an empty completion.
    fn spi_stop(&mut self, spi: Self::Spi);

    fn timer_init(&mut self) -> Result<Self::Timer, HostError>;

    fn timer_start(&mut self, timer: Self::Timer, period: Duration, repeat: bool);

    fn attr_init(&mut self, name: &str, initial: f32) -> Result<Self::Attribute, HostError>;

    fn attr_read(&self, attr: Self::Attribute) -> f32;
}

/// Two-wire bus callbacks.
pub trait I2cTarget {
    /// A controller addressed the chip. Returns ACK (`true`) or NACK.
    fn connect(&mut self, address: u8, read: bool) -> bool;

    /// The controller clocks in one byte from the chip.
    fn read(&mut self) -> u8;

    /// The controller sent one byte. Returns ACK (`true`) or NACK.
    fn write(&mut self, data: u8) -> bool;

    /// The transaction ended.
    fn disconnect(&mut self) {}
}

/// Watched pin callbacks.
pub trait PinWatcher<H: Host> {
    fn pin_change(&mut self, host: &mut H, pin: H::Pin, level: PinState);
}

/// SPI completion callback.
pub trait SpiTarget<H: Host> {
    /// An exchange finished. `received` is empty when it was aborted by
    /// [`Host::spi_stop`].
    fn spi_done(&mut self, host: &mut H, received: &[u8]);
}

/// Timer callback.
pub trait TimerTarget {
    fn timer_fired(&mut self);
}
