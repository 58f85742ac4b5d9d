//! In-memory [`Host`] that records what the chip registered.

use embassy_time::Duration;
use embedded_hal::digital::PinState;
use log::warn;

use crate::host::{Edge, Host, HostError, I2cConfig, PinMode, SpiConfig};

const MAX_PINS: usize = 8;
const MAX_TIMERS: usize = 2;
const MAX_ATTRIBUTES: usize = 4;
const MAX_TRANSFER: usize = 8;
const ATTRIBUTE_NAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinId(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiId(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeId(u8);

/// Primitive kinds that can be withheld to exercise setup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Pin,
    I2c,
    Spi,
    Timer,
    Attribute,
}

#[derive(Debug, Clone, Copy)]
struct SimPin {
    name: &'static str,
    mode: PinMode,
    level: PinState,
    watch: Option<Edge>,
}

/// Recorded state of a host timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    pub period: Duration,
    pub repeat: bool,
    pub running: bool,
    elapsed_us: u64,
}

#[derive(Debug)]
struct SimAttribute {
    name: heapless::String<ATTRIBUTE_NAME_LEN>,
    value: f32,
}

/// Result of driving a pin from the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinChange {
    pub pin: PinId,
    /// The pin is watched for this transition
    pub notify: bool,
}

/// Fake simulation host.
///
/// Strap levels are set before the chip is created; pins nobody strapped read
/// their pull level. SPI exchanges are held until the driver clocks them (see
/// [`Simulation::spi_exchange`](super::Simulation::spi_exchange)).
#[derive(Debug, Default)]
pub struct SimHost {
    pins: heapless::Vec<SimPin, MAX_PINS>,
    straps: heapless::Vec<(&'static str, PinState), MAX_PINS>,
    unavailable: heapless::Vec<Primitive, 5>,
    i2c: Option<I2cConfig<PinId>>,
    spi: Option<SpiConfig<PinId>>,
    transfer: Option<heapless::Vec<u8, MAX_TRANSFER>>,
    aborted: bool,
    spi_starts: u32,
    spi_stops: u32,
    timers: heapless::Vec<TimerState, MAX_TIMERS>,
    attributes: heapless::Vec<SimAttribute, MAX_ATTRIBUTES>,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ties the named pin to `level` before the chip reads it.
    pub fn with_strap(mut self, name: &'static str, level: PinState) -> Self {
        match self.straps.iter_mut().find(|(strap, _)| *strap == name) {
            Some(strap) => strap.1 = level,
            None => {
                if self.straps.push((name, level)).is_err() {
                    warn!("Strap table full, ignoring {}", name);
                }
            }
        }
        self
    }

    /// Makes creation of the given primitive fail.
    pub fn without(mut self, primitive: Primitive) -> Self {
        if !self.unavailable.contains(&primitive) {
            let _ = self.unavailable.push(primitive);
        }
        self
    }

    fn check(&self, primitive: Primitive, err: HostError) -> Result<(), HostError> {
        if self.unavailable.contains(&primitive) {
            Err(err)
        } else {
            Ok(())
        }
    }

    fn find_pin(&self, name: &str) -> Option<(usize, &SimPin)> {
        self.pins
            .iter()
            .enumerate()
            .rev()
            .find(|(_, pin)| pin.name == name)
    }

    pub fn pin_mode(&self, name: &str) -> Option<PinMode> {
        self.find_pin(name).map(|(_, pin)| pin.mode)
    }

    pub fn pin_level(&self, name: &str) -> Option<PinState> {
        self.find_pin(name).map(|(_, pin)| pin.level)
    }

    pub fn is_watched(&self, name: &str) -> bool {
        self.find_pin(name).is_some_and(|(_, pin)| pin.watch.is_some())
    }

    /// Drives a created pin. Returns `None` if no pin has that name.
    pub fn drive_pin(&mut self, name: &str, level: PinState) -> Option<PinChange> {
        let (index, _) = self.find_pin(name)?;
        let pin = &mut self.pins[index];
        let previous = pin.level;
        pin.level = level;

        Some(PinChange {
            pin: PinId(index as u8),
            notify: pin.watch.is_some_and(|edge| edge.matches(previous, level)),
        })
    }

    pub fn i2c_config(&self) -> Option<&I2cConfig<PinId>> {
        self.i2c.as_ref()
    }

    pub fn spi_config(&self) -> Option<&SpiConfig<PinId>> {
        self.spi.as_ref()
    }

    /// An exchange has been started and not yet clocked or stopped.
    pub fn spi_in_flight(&self) -> bool {
        self.transfer.is_some()
    }

    pub fn spi_starts(&self) -> u32 {
        self.spi_starts
    }

    pub fn spi_stops(&self) -> u32 {
        self.spi_stops
    }

    /// Removes the in-flight exchange so it can be clocked.
    pub fn take_transfer(&mut self) -> Option<heapless::Vec<u8, MAX_TRANSFER>> {
        self.transfer.take()
    }

    /// Whether a stop aborted an exchange since the last call.
    pub fn take_abort(&mut self) -> bool {
        core::mem::take(&mut self.aborted)
    }

    pub fn timer(&self, timer: TimerId) -> Option<TimerState> {
        self.timers.get(timer.0 as usize).copied()
    }

    /// Moves a timer forward and returns how many times it fired.
    pub fn advance_timer(&mut self, timer: TimerId, dt: Duration) -> u32 {
        let Some(state) = self.timers.get_mut(timer.0 as usize) else {
            return 0;
        };
        let period_us = state.period.as_micros();
        if !state.running || period_us == 0 {
            return 0;
        }

        state.elapsed_us += dt.as_micros();
        let fired = state.elapsed_us / period_us;
        state.elapsed_us %= period_us;

        if fired > 0 && !state.repeat {
            state.running = false;
            return 1;
        }
        fired as u32
    }

    pub fn attribute(&self, name: &str) -> Option<f32> {
        self.attributes
            .iter()
            .find(|attr| attr.name.as_str() == name)
            .map(|attr| attr.value)
    }

    /// Host-side write of a telemetry attribute. Returns `false` if unknown.
    pub fn set_attribute(&mut self, name: &str, value: f32) -> bool {
        match self
            .attributes
            .iter_mut()
            .find(|attr| attr.name.as_str() == name)
        {
            Some(attr) => {
                attr.value = value;
                true
            }
            None => false,
        }
    }
}

impl Host for SimHost {
    type Pin = PinId;
    type Spi = SpiId;
    type Timer = TimerId;
    type Attribute = AttributeId;

    fn pin_init(&mut self, name: &'static str, mode: PinMode) -> Result<PinId, HostError> {
        self.check(Primitive::Pin, HostError::PinUnavailable { name })?;

        let level = self
            .straps
            .iter()
            .find(|(strap, _)| *strap == name)
            .map_or(mode.idle_level(), |(_, level)| *level);

        let index = self.pins.len();
        self.pins
            .push(SimPin {
                name,
                mode,
                level,
                watch: None,
            })
            .map_err(|_| HostError::PinUnavailable { name })?;
        Ok(PinId(index as u8))
    }

    fn pin_read(&self, pin: PinId) -> PinState {
        self.pins
            .get(pin.0 as usize)
            .map_or(PinState::Low, |pin| pin.level)
    }

    fn pin_watch(&mut self, pin: PinId, edge: Edge) -> Result<(), HostError> {
        let pin = self
            .pins
            .get_mut(pin.0 as usize)
            .ok_or(HostError::PinUnavailable { name: "unknown" })?;
        pin.watch = Some(edge);
        Ok(())
    }

    fn i2c_init(&mut self, config: I2cConfig<PinId>) -> Result<(), HostError> {
        self.check(Primitive::I2c, HostError::BusUnavailable { bus: "I2C" })?;
        self.i2c = Some(config);
        Ok(())
    }

    fn spi_init(&mut self, config: SpiConfig<PinId>) -> Result<SpiId, HostError> {
        self.check(Primitive::Spi, HostError::BusUnavailable { bus: "SPI" })?;
        self.spi = Some(config);
        Ok(SpiId(0))
    }

    fn spi_start(&mut self, _spi: SpiId, buffer: &[u8]) {
        self.spi_starts += 1;
        self.transfer = heapless::Vec::from_slice(buffer).ok();
        if self.transfer.is_none() {
            warn!("SPI transfer of {} bytes exceeds harness capacity", buffer.len());
        }
    }

    fn spi_stop(&mut self, _spi: SpiId) {
        self.spi_stops += 1;
        if self.transfer.take().is_some() {
            self.aborted = true;
        }
    }

    fn timer_init(&mut self) -> Result<TimerId, HostError> {
        self.check(Primitive::Timer, HostError::TimerUnavailable)?;

        let index = self.timers.len();
        self.timers
            .push(TimerState {
                period: Duration::from_micros(0),
                repeat: false,
                running: false,
                elapsed_us: 0,
            })
            .map_err(|_| HostError::TimerUnavailable)?;
        Ok(TimerId(index as u8))
    }

    fn timer_start(&mut self, timer: TimerId, period: Duration, repeat: bool) {
        if let Some(state) = self.timers.get_mut(timer.0 as usize) {
            state.period = period;
            state.repeat = repeat;
            state.running = true;
            state.elapsed_us = 0;
        }
    }

    fn attr_init(&mut self, name: &str, initial: f32) -> Result<AttributeId, HostError> {
        self.check(Primitive::Attribute, HostError::AttributeUnavailable)?;

        let mut attr_name = heapless::String::new();
        attr_name
            .push_str(name)
            .map_err(|_| HostError::AttributeUnavailable)?;

        let index = self.attributes.len();
        self.attributes
            .push(SimAttribute {
                name: attr_name,
                value: initial,
            })
            .map_err(|_| HostError::AttributeUnavailable)?;
        Ok(AttributeId(index as u8))
    }

    fn attr_read(&self, attr: AttributeId) -> f32 {
        self.attributes
            .get(attr.0 as usize)
            .map_or(f32::NAN, |attr| attr.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstrapped_pins_read_pull_level() {
        let mut host = SimHost::new();
        let up = host.pin_init("PS", PinMode::InputPullUp).unwrap();
        let down = host.pin_init("CSB", PinMode::InputPullDown).unwrap();
        assert_eq!(host.pin_read(up), PinState::High);
        assert_eq!(host.pin_read(down), PinState::Low);
    }

    #[test]
    fn test_strap_overrides_pull() {
        let mut host = SimHost::new().with_strap("PS", PinState::Low);
        let ps = host.pin_init("PS", PinMode::InputPullUp).unwrap();
        assert_eq!(host.pin_read(ps), PinState::Low);
    }

    #[test]
    fn test_drive_watched_pin() {
        let mut host = SimHost::new();
        let cs = host.pin_init("CS", PinMode::InputPullUp).unwrap();
        host.pin_watch(cs, Edge::Falling).unwrap();

        let change = host.drive_pin("CS", PinState::Low).unwrap();
        assert_eq!(change, PinChange { pin: cs, notify: true });

        let change = host.drive_pin("CS", PinState::High).unwrap();
        assert!(!change.notify);
        assert!(host.drive_pin("SCK", PinState::High).is_none());
    }

    #[test]
    fn test_pin_table_exhaustion() {
        let mut host = SimHost::new();
        for _ in 0..MAX_PINS {
            host.pin_init("P", PinMode::Input).unwrap();
        }
        assert_eq!(
            host.pin_init("P", PinMode::Input),
            Err(HostError::PinUnavailable { name: "P" })
        );
    }

    #[test]
    fn test_stop_without_transfer_is_not_an_abort() {
        let mut host = SimHost::new();
        let spi = host
            .spi_init(SpiConfig {
                sck: PinId(0),
                mosi: PinId(1),
                miso: PinId(2),
                mode: embedded_hal::spi::MODE_0,
            })
            .unwrap();
        host.spi_stop(spi);
        assert!(!host.take_abort());

        host.spi_start(spi, b"x");
        host.spi_stop(spi);
        assert!(host.take_abort());
        assert!(!host.take_abort());
    }

    #[test]
    fn test_one_shot_timer() {
        let mut host = SimHost::new();
        let timer = host.timer_init().unwrap();
        host.timer_start(timer, Duration::from_millis(10), false);
        assert_eq!(host.advance_timer(timer, Duration::from_millis(35)), 1);
        assert_eq!(host.advance_timer(timer, Duration::from_millis(35)), 0);
    }

    #[test]
    fn test_attribute_write() {
        let mut host = SimHost::new();
        let attr = host.attr_init("barometricPressure", 1000.0).unwrap();
        assert!(host.set_attribute("barometricPressure", 1013.25));
        assert_eq!(host.attr_read(attr), 1013.25);
        assert!(!host.set_attribute("humidity", 1.0));
    }
}
