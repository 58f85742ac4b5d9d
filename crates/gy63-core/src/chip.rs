//! The chip instance: register file, active bus handler, sample refresh and
//! telemetry, bundled in one owned value.

use embedded_hal::digital::PinState;
use log::{info, warn};
use thiserror_no_std::Error;

use crate::calibration::{Calibration, RawMeasurement};
use crate::config::ChipConfig;
use crate::host::{Host, HostError, I2cTarget, PinWatcher, SpiTarget, TimerTarget};
use crate::protocol::{self, BusHandler, Protocol};
use crate::registers::RegisterFile;
use crate::sampling::{DEFAULT_SEED, SampleRefresh};
use crate::settings::MeasurementSettings;
use crate::telemetry::Telemetry;

/// Byte returned when a two-wire read reaches a chip wired for SPI.
const FLOATING_BUS: u8 = 0xFF;

#[derive(Error, Debug)]
pub enum ChipError {
    #[error("Host primitive failed: {0}")]
    Host(HostError),
    #[error("Configuration decode failed: {0}")]
    Config(postcard::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl From<HostError> for ChipError {
    fn from(err: HostError) -> Self {
        Self::Host(err)
    }
}

/// A simulated GY-63 / BMP280.
///
/// Created once by the host at startup. Construction reads the protocol
/// straps, registers exactly one bus handler set, registers the pressure
/// attribute and starts the repeating refresh timer. Afterwards the host feeds
/// events in through the callback traits.
pub struct Chip<H: Host> {
    registers: RegisterFile,
    bus: BusHandler<H>,
    refresh: SampleRefresh,
    timer: H::Timer,
    telemetry: Telemetry<H>,
}

impl<H: Host> Chip<H> {
    /// Creates the chip with the stock configuration.
    pub fn new(host: &mut H) -> Result<Self, ChipError> {
        Self::with_config(host, &ChipConfig::default())
    }

    pub fn with_config(host: &mut H, config: &ChipConfig) -> Result<Self, ChipError> {
        config.validate()?;

        let bus = protocol::select(host)?;
        let timer = host.timer_init()?;
        let registers = RegisterFile::new();
        let telemetry =
            Telemetry::register(host, &config.pressure_attribute, config.pressure_initial)?;

        let refresh = SampleRefresh::new(
            config.noise_base,
            config.noise_span,
            config.seed.unwrap_or(DEFAULT_SEED),
        );
        host.timer_start(timer, config.refresh_period(), true);

        info!("Hello from GY-63!");

        Ok(Self {
            registers,
            bus,
            refresh,
            timer,
            telemetry,
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.bus.protocol()
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Two-wire address cursor; `None` when the chip speaks SPI.
    pub fn cursor(&self) -> Option<u8> {
        match &self.bus {
            BusHandler::TwoWire(bus) => Some(bus.cursor()),
            BusHandler::FourWire(_) => None,
        }
    }

    /// Whether SPI chip select is asserted; `None` when the chip speaks I2C.
    pub fn is_selected(&self) -> Option<bool> {
        match &self.bus {
            BusHandler::TwoWire(_) => None,
            BusHandler::FourWire(bus) => Some(bus.is_selected()),
        }
    }

    pub fn calibration(&self) -> Calibration {
        Calibration::from_registers(&self.registers)
    }

    pub fn raw_measurement(&self) -> RawMeasurement {
        RawMeasurement::from_registers(&self.registers)
    }

    pub fn settings(&self) -> MeasurementSettings {
        MeasurementSettings::from_registers(&self.registers)
    }

    pub fn refresh(&self) -> &SampleRefresh {
        &self.refresh
    }

    pub fn timer(&self) -> H::Timer {
        self.timer
    }

    pub fn telemetry(&self) -> &Telemetry<H> {
        &self.telemetry
    }
}

impl<H: Host> I2cTarget for Chip<H> {
    fn connect(&mut self, address: u8, read: bool) -> bool {
        match &mut self.bus {
            BusHandler::TwoWire(bus) => bus.connect(address, read),
            BusHandler::FourWire(_) => {
                warn!("I2C connect to {:#04x} while in SPI mode", address);
                false
            }
        }
    }

    fn read(&mut self) -> u8 {
        match &mut self.bus {
            BusHandler::TwoWire(bus) => bus.read(&self.registers),
            BusHandler::FourWire(_) => {
                warn!("I2C read while in SPI mode");
                FLOATING_BUS
            }
        }
    }

    fn write(&mut self, data: u8) -> bool {
        match &mut self.bus {
            BusHandler::TwoWire(bus) => bus.write(&mut self.registers, data),
            BusHandler::FourWire(_) => {
                warn!("I2C write while in SPI mode");
                false
            }
        }
    }

    fn disconnect(&mut self) {
        if let BusHandler::TwoWire(bus) = &mut self.bus {
            bus.disconnect();
        }
    }
}

impl<H: Host> PinWatcher<H> for Chip<H> {
    fn pin_change(&mut self, host: &mut H, pin: H::Pin, level: PinState) {
        match &mut self.bus {
            BusHandler::FourWire(bus) => bus.pin_change(host, pin, level),
            BusHandler::TwoWire(_) => warn!("Unexpected pin change on {:?}", pin),
        }
    }
}

impl<H: Host> SpiTarget<H> for Chip<H> {
    fn spi_done(&mut self, host: &mut H, received: &[u8]) {
        match &mut self.bus {
            BusHandler::FourWire(bus) => bus.transfer_done(host, received),
            BusHandler::TwoWire(_) => warn!("SPI completion while in I2C mode"),
        }
    }
}

impl<H: Host> TimerTarget for Chip<H> {
    fn timer_fired(&mut self) {
        self.refresh.tick(&mut self.registers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{Primitive, SimHost, Simulation};
    use crate::host::PinMode;
    use crate::registers::Register;
    use crate::sampling::REFRESH_TARGET;
    use embassy_time::Duration;

    fn two_wire(csb: PinState) -> Simulation {
        let host = SimHost::new()
            .with_strap("PS", PinState::High)
            .with_strap("CSB", csb);
        Simulation::new(host).unwrap()
    }

    fn four_wire() -> Simulation {
        Simulation::new(SimHost::new().with_strap("PS", PinState::Low)).unwrap()
    }

    #[test]
    fn test_power_on_register_contents() {
        let sim = two_wire(PinState::Low);
        assert_eq!(sim.chip().registers(), &RegisterFile::new());
        assert_eq!(sim.chip().registers()[Register::ChipId], 0x58);
    }

    #[test]
    fn test_protocol_exclusivity() {
        for ps in [PinState::Low, PinState::High] {
            for csb in [PinState::Low, PinState::High] {
                let host = SimHost::new().with_strap("PS", ps).with_strap("CSB", csb);
                let sim = Simulation::new(host).unwrap();

                let i2c = sim.host().i2c_config().is_some();
                let spi = sim.host().spi_config().is_some();
                assert!(i2c ^ spi, "ps={:?} csb={:?}", ps, csb);
                assert_eq!(i2c, ps == PinState::High);
                assert_eq!(sim.chip().cursor().is_some(), i2c);
                assert_eq!(sim.chip().is_selected().is_some(), spi);
            }
        }
    }

    #[test]
    fn test_default_straps_select_two_wire_primary() {
        let sim = Simulation::new(SimHost::new()).unwrap();
        assert_eq!(
            sim.chip().protocol(),
            Protocol::TwoWire { address: 0x77 }
        );
    }

    #[test]
    fn test_address_resolution() {
        let primary = two_wire(PinState::Low);
        assert_eq!(primary.chip().protocol(), Protocol::TwoWire { address: 0x77 });
        assert_eq!(primary.host().i2c_config().map(|c| c.address), Some(0x77));

        let alternate = two_wire(PinState::High);
        assert_eq!(alternate.chip().protocol(), Protocol::TwoWire { address: 0x76 });
        assert_eq!(alternate.host().i2c_config().map(|c| c.address), Some(0x76));
    }

    #[test]
    fn test_startup_registers_timer_and_attribute() {
        let sim = two_wire(PinState::Low);
        let timer = sim.host().timer(sim.chip().timer()).unwrap();
        assert_eq!(timer.period, Duration::from_micros(100_000));
        assert!(timer.repeat);
        assert!(timer.running);

        assert_eq!(sim.host().attribute("barometricPressure"), Some(1000.0));
        assert_eq!(sim.chip().telemetry().pressure(sim.host()), 1000.0);
    }

    #[test]
    fn test_four_wire_pins() {
        let sim = four_wire();
        assert_eq!(sim.chip().protocol(), Protocol::FourWire);
        assert_eq!(sim.host().pin_mode("CS"), Some(PinMode::InputPullUp));
        assert!(sim.host().is_watched("CS"));
        assert_eq!(sim.host().pin_mode("CSB"), None);
    }

    #[test]
    fn test_two_wire_round_trip() {
        let mut sim = two_wire(PinState::Low);
        for register in Register::SELECTABLE {
            assert!(sim.i2c_write(&[register.addr(), 0x5A]));
            let mut out = [0u8; 1];
            assert!(sim.i2c_write_read(register.addr(), &mut out));
            assert_eq!(out, [0x5A], "register {:?}", register);
        }
    }

    #[test]
    fn test_cursor_auto_increment() {
        let mut sim = two_wire(PinState::Low);
        let mut out = [0u8; 2];
        assert!(sim.i2c_write_read(Register::TEMPERATURE_DATA.addr(), &mut out));
        assert_eq!(out, [0x7E, 0xED]);
        assert_eq!(sim.chip().cursor(), Some(0xFC));
    }

    #[test]
    fn test_end_to_end_calibration_read() {
        let mut sim = two_wire(PinState::Low);
        assert_eq!(sim.chip().protocol(), Protocol::TwoWire { address: 0x77 });

        assert!(sim.i2c_write(&[0x88]));
        let mut first = [0u8; 1];
        assert!(sim.i2c_read(&mut first));
        assert_eq!(first, [0x70]);

        let mut second = [0u8; 1];
        assert!(sim.i2c_read(&mut second));
        assert_eq!(second, [0x6B]);
    }

    #[test]
    fn test_driver_configuration_is_decoded() {
        let mut sim = two_wire(PinState::Low);
        sim.i2c_write(&[Register::CtrlMeas.addr(), 0b010_101_11]);
        sim.i2c_write(&[Register::Config.addr(), 0b100_100_00]);

        let settings = sim.chip().settings();
        assert_eq!(settings.mode, crate::settings::PowerMode::Normal);
        assert_eq!(settings.filter, crate::settings::IirFilter::X16);
    }

    #[test]
    fn test_soft_reset_code_is_stored_only() {
        let mut sim = two_wire(PinState::Low);
        sim.i2c_write(&[Register::CtrlMeas.addr(), 0x27]);
        sim.i2c_write(&[Register::SoftReset.addr(), crate::registers::RESET_CODE]);

        assert_eq!(sim.chip().registers()[Register::SoftReset], 0xB6);
        assert_eq!(sim.chip().registers()[Register::CtrlMeas], 0x27);
    }

    #[test]
    fn test_timer_ticks_refresh_temperature_lsb() {
        let mut sim = two_wire(PinState::Low);
        let before = sim.chip().registers().clone();

        assert_eq!(sim.advance(Duration::from_millis(50)), 0);
        assert_eq!(sim.chip().registers(), &before);

        for _ in 0..20 {
            let snapshot = sim.chip().registers().clone();
            assert_eq!(sim.advance(Duration::from_millis(100)), 1);

            let value = sim.chip().registers()[REFRESH_TARGET];
            assert!((75..=149).contains(&value));
            for addr in 0..=u8::MAX {
                if addr != REFRESH_TARGET.addr() {
                    assert_eq!(sim.chip().registers()[addr], snapshot[addr]);
                }
            }
        }
        assert_eq!(sim.chip().refresh().ticks(), 20);
    }

    #[test]
    fn test_refreshed_value_visible_over_bus() {
        let mut sim = two_wire(PinState::Low);
        sim.advance(Duration::from_millis(100));

        let mut out = [0u8; 3];
        sim.i2c_write_read(Register::TEMPERATURE_DATA.addr(), &mut out);
        assert_eq!(out[0], 0x7E);
        assert_eq!(out[1], sim.chip().registers()[REFRESH_TARGET]);
        assert!((75..=149).contains(&out[1]));
    }

    #[test]
    fn test_spi_echo_stream() {
        let mut sim = four_wire();
        assert_eq!(sim.spi_exchange(b'x'), None);

        sim.set_chip_select(PinState::Low);
        assert_eq!(sim.chip().is_selected(), Some(true));

        let echoed = sim.spi_transfer(b"Hello, GY-63");
        // first byte out is the seed, every later byte is the previous one rotated
        assert_eq!(&echoed[..], b" Uryyb, TL-6");

        sim.set_chip_select(PinState::High);
        assert_eq!(sim.chip().is_selected(), Some(false));
    }

    #[test]
    fn test_spi_deselect_stops_exchanges() {
        let mut sim = four_wire();
        sim.set_chip_select(PinState::Low);
        assert_eq!(sim.spi_exchange(b'a'), Some(b' '));
        assert!(sim.host().spi_in_flight());

        sim.set_chip_select(PinState::High);
        assert!(!sim.host().spi_in_flight());
        let completions = sim.completions();

        assert_eq!(sim.spi_exchange(b'b'), None);
        assert_eq!(sim.spi_exchange(b'c'), None);
        assert_eq!(sim.completions(), completions);

        // reselecting restarts the stream from the seed byte
        sim.set_chip_select(PinState::Low);
        assert_eq!(sim.spi_exchange(b'd'), Some(b' '));
        assert_eq!(sim.spi_exchange(b'e'), Some(b'q'));
    }

    #[test]
    fn test_spi_completion_after_release_does_not_restart() {
        let mut sim = four_wire();
        sim.set_chip_select(PinState::Low);
        assert_eq!(sim.host().spi_starts(), 1);

        // CS goes high but its edge has not been delivered yet
        sim.host_mut().drive_pin("CS", PinState::High);
        assert_eq!(sim.host().pin_level("CS"), Some(PinState::High));
        assert_eq!(sim.chip().is_selected(), Some(true));

        assert_eq!(sim.spi_exchange(b'a'), Some(b' '));
        assert_eq!(sim.host().spi_starts(), 1);
        assert!(!sim.host().spi_in_flight());
        assert_eq!(sim.spi_exchange(b'b'), None);
    }

    #[test]
    fn test_spi_abort_is_reported_empty() {
        let mut sim = four_wire();
        sim.set_chip_select(PinState::Low);
        let before = sim.completions();
        sim.set_chip_select(PinState::High);

        assert_eq!(sim.completions(), before + 1);
        assert_eq!(sim.host().spi_stops(), 1);
        assert_eq!(sim.chip().is_selected(), Some(false));
    }

    #[test]
    fn test_spi_mode_ignores_i2c() {
        let mut sim = four_wire();
        let before = sim.chip().registers().clone();
        assert!(!sim.chip_mut().connect(0x77, false));
        assert!(!sim.chip_mut().write(0x88));
        assert_eq!(sim.chip_mut().read(), 0xFF);
        assert_eq!(sim.chip().registers(), &before);
    }

    #[test]
    fn test_four_wire_timer_still_runs() {
        let mut sim = four_wire();
        assert_eq!(sim.advance(Duration::from_millis(300)), 3);
        assert!(sim.chip().refresh().range().contains(&sim.chip().registers()[REFRESH_TARGET]));
    }

    #[test]
    fn test_missing_primitive_is_reported() {
        let host = SimHost::new().without(Primitive::Timer);
        assert!(matches!(
            Simulation::new(host),
            Err(ChipError::Host(HostError::TimerUnavailable))
        ));

        let host = SimHost::new()
            .with_strap("PS", PinState::Low)
            .without(Primitive::Spi);
        assert!(matches!(
            Simulation::new(host),
            Err(ChipError::Host(HostError::BusUnavailable { bus: "SPI" }))
        ));
    }

    #[test]
    fn test_custom_config() {
        let config = ChipConfig {
            refresh_period_us: 10_000,
            noise_base: 10,
            noise_span: 5,
            seed: Some(3),
            ..ChipConfig::default()
        };
        let mut sim = Simulation::with_config(SimHost::new(), &config).unwrap();
        assert_eq!(sim.advance(Duration::from_millis(100)), 10);
        assert!((10..=14).contains(&sim.chip().registers()[REFRESH_TARGET]));
    }
}
