//! Desktop host for the GY-63 chip model.
//!
//! Plays the part of a microcontroller talking to the simulated chip. Each
//! session builds a fresh chip on an in-memory host with different straps and
//! drives it the way a BMP280 driver would.
//!
//! | Session            | Straps            | What happens                          |
//! |--------------------|-------------------|---------------------------------------|
//! | I2C primary        | PS high, CSB low  | calibration dump, configure, poll     |
//! | I2C alternate      | PS high, CSB high | address check                         |
//! | SPI echo           | PS low            | clock a string through the ROT13 echo |
//!
//! Set `RUST_LOG=debug` to see every register access.

use std::time::{Duration as StdDuration, Instant};

use embedded_hal::digital::PinState;
use log::{error, info};

use gy63_core::calibration::{Calibration, RawMeasurement};
use gy63_core::harness::{SimHost, Simulation};
use gy63_core::registers::Register;
use gy63_core::telemetry::PRESSURE_ATTRIBUTE;
use gy63_core::{ChipConfig, ChipError, Protocol};

// ---------------------------------------------------------------------------
// Session constants
// ---------------------------------------------------------------------------

/// Number of samples polled in the I2C session.
const POLL_COUNT: usize = 10;

/// ctrl_meas: osrs_t x1, osrs_p x1, normal mode.
const CTRL_MEAS_NORMAL: u8 = 0x27;

/// config: t_sb 62.5 ms, filter off.
const CONFIG_62MS: u8 = 0x20;

/// Message clocked through the SPI session.
const SPI_MESSAGE: &[u8] = b"Hello from the controller!";

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Read calibration, configure and poll the chip over I2C at its primary address.
fn i2c_primary_session(config: &ChipConfig) -> Result<(), ChipError> {
    let host = SimHost::new()
        .with_strap("PS", PinState::High)
        .with_strap("CSB", PinState::Low);
    let mut sim = Simulation::with_config(host, config)?;
    info!("Protocol: {:?}", sim.chip().protocol());
    info!("Chip ID register: {:#04x}", sim.chip().registers()[Register::ChipId]);

    let mut calib_bytes = [0u8; Calibration::LEN];
    if !sim.i2c_write_read(Register::CALIBRATION_START.addr(), &mut calib_bytes) {
        error!("Calibration read was not acknowledged");
    }
    info!("Calibration: {:?}", Calibration::from_bytes(&calib_bytes));

    sim.i2c_write(&[Register::CtrlMeas.addr(), CTRL_MEAS_NORMAL]);
    sim.i2c_write(&[Register::Config.addr(), CONFIG_62MS]);
    info!("Settings: {:?}", sim.chip().settings());

    let period = config.refresh_period();
    let wall_period = StdDuration::from_micros(period.as_micros());

    for sample in 0..POLL_COUNT {
        let started = Instant::now();
        let fired = sim.advance(period);

        let mut data = [0u8; 6];
        sim.i2c_write_read(Register::PRESSURE_DATA.addr(), &mut data);
        let raw = RawMeasurement::from_registers(sim.chip().registers());
        info!(
            "Sample {:2}: ticks={} bytes={:02x?} adc_p={} adc_t={}",
            sample, fired, data, raw.adc_p, raw.adc_t
        );

        let elapsed = started.elapsed();
        if elapsed < wall_period {
            std::thread::sleep(wall_period - elapsed);
        }
    }

    sim.host_mut().set_attribute(PRESSURE_ATTRIBUTE, 1013.25);
    info!(
        "Telemetry {} = {}",
        PRESSURE_ATTRIBUTE,
        sim.chip().telemetry().pressure(sim.host())
    );
    Ok(())
}

/// Confirm the CSB strap moves the chip to its alternate address.
fn i2c_alternate_session(config: &ChipConfig) -> Result<(), ChipError> {
    let host = SimHost::new()
        .with_strap("PS", PinState::High)
        .with_strap("CSB", PinState::High);
    let mut sim = Simulation::with_config(host, config)?;

    match sim.chip().protocol() {
        Protocol::TwoWire { address } => info!("Alternate address: {:#04x}", address),
        Protocol::FourWire => error!("Expected I2C with CSB strapped high"),
    }

    let mut dig_t1 = [0u8; 2];
    sim.i2c_write_read(Register::CALIBRATION_START.addr(), &mut dig_t1);
    info!("dig_T1 bytes: {:02x?}", dig_t1);
    Ok(())
}

/// Clock a message through the SPI echo stream.
fn spi_session(config: &ChipConfig) -> Result<(), ChipError> {
    let host = SimHost::new().with_strap("PS", PinState::Low);
    let mut sim = Simulation::with_config(host, config)?;
    info!("Protocol: {:?}", sim.chip().protocol());

    sim.set_chip_select(PinState::Low);
    let echoed = sim.spi_transfer(SPI_MESSAGE);
    sim.set_chip_select(PinState::High);

    info!("MOSI: {}", String::from_utf8_lossy(SPI_MESSAGE));
    info!("MISO: {}", String::from_utf8_lossy(&echoed));
    info!(
        "Exchanges: {} started, {} completed",
        sim.host().spi_starts(),
        sim.completions()
    );

    // Nothing is clocked once chip select is released
    if sim.spi_exchange(b'?').is_some() {
        error!("Exchange running after deselect");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting GY-63 simulator");

    let config = ChipConfig {
        seed: Some(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        ),
        ..ChipConfig::default()
    };
    info!(
        "Refresh every {} us, noise {}..{}",
        config.refresh_period_us,
        config.noise_base,
        config.noise_base as u16 + config.noise_span as u16
    );

    let sessions: [(&str, fn(&ChipConfig) -> Result<(), ChipError>); 3] = [
        ("I2C primary", i2c_primary_session),
        ("I2C alternate", i2c_alternate_session),
        ("SPI echo", spi_session),
    ];

    for (name, session) in sessions {
        info!("--- {} ---", name);
        if let Err(e) = session(&config) {
            error!("{} session failed: {}", name, e);
        }
    }

    info!("Simulator exiting");
}
