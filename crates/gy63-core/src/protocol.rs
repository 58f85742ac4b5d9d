//! Power-up protocol selection.
//!
//! The PS pin chooses the bus: pulled high (the default) the chip speaks I2C,
//! tied low it speaks SPI. Under I2C the CSB pin doubles as an address strap.

use embedded_hal::digital::PinState;
use embedded_hal::spi::MODE_0;
use log::info;

use crate::host::{Edge, Host, HostError, I2cConfig, PinMode, SpiConfig};
use crate::i2c::{ALTERNATE_ADDRESS, PRIMARY_ADDRESS, TwoWireBus};
use crate::spi::FourWireBus;

pub const PROTOCOL_SELECT_PIN: &str = "PS";
pub const ADDRESS_SELECT_PIN: &str = "CSB";
pub const CHIP_SELECT_PIN: &str = "CS";

/// Bus protocol fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    TwoWire { address: u8 },
    FourWire,
}

/// The handler set registered with the host. Exactly one exists per chip.
pub enum BusHandler<H: Host> {
    TwoWire(TwoWireBus),
    FourWire(FourWireBus<H>),
}

impl<H: Host> BusHandler<H> {
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::TwoWire(bus) => Protocol::TwoWire {
                address: bus.address(),
            },
            Self::FourWire(_) => Protocol::FourWire,
        }
    }
}

/// Address selected by the CSB strap.
pub const fn resolve_address(strap: PinState) -> u8 {
    match strap {
        PinState::Low => PRIMARY_ADDRESS,
        PinState::High => ALTERNATE_ADDRESS,
    }
}

/// Reads the straps and registers the matching bus with the host.
pub fn select<H: Host>(host: &mut H) -> Result<BusHandler<H>, HostError> {
    let ps = host.pin_init(PROTOCOL_SELECT_PIN, PinMode::InputPullUp)?;

    if host.pin_read(ps) == PinState::High {
        let csb = host.pin_init(ADDRESS_SELECT_PIN, PinMode::InputPullDown)?;
        let address = resolve_address(host.pin_read(csb));

        let config = I2cConfig {
            address,
            scl: host.pin_init("SCL", PinMode::Input)?,
            sda: host.pin_init("SDA", PinMode::Input)?,
        };
        host.i2c_init(config)?;
        info!("I'm using I2c Protocol (address {:#04x})", address);

        Ok(BusHandler::TwoWire(TwoWireBus::new(address)))
    } else {
        let cs = host.pin_init(CHIP_SELECT_PIN, PinMode::InputPullUp)?;
        host.pin_watch(cs, Edge::Both)?;

        let config = SpiConfig {
            sck: host.pin_init("SCK", PinMode::Input)?,
            mosi: host.pin_init("MOSI", PinMode::Input)?,
            miso: host.pin_init("MISO", PinMode::Input)?,
            mode: MODE_0,
        };
        let spi = host.spi_init(config)?;
        info!("I'm using SPI Protocol");

        Ok(BusHandler::FourWire(FourWireBus::new(cs, spi)))
    }
}
