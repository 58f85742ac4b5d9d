//! Host-visible barometric pressure attribute.
//!
//! The attribute is a passive slot: the host and its scripts may read or change
//! it, but the chip never feeds it into the register file.

use log::info;

use crate::host::{Host, HostError};

/// Attribute name registered with the host.
pub const PRESSURE_ATTRIBUTE: &str = "barometricPressure";

/// Initial attribute value.
pub const PRESSURE_INITIAL: f32 = 1000.0;

pub struct Telemetry<H: Host> {
    pressure: H::Attribute,
}

impl<H: Host> Telemetry<H> {
    /// Registers the pressure attribute with the host.
    pub fn register(host: &mut H, name: &str, initial: f32) -> Result<Self, HostError> {
        let pressure = host.attr_init(name, initial)?;
        info!("Registered attribute {} = {}", name, initial);
        Ok(Self { pressure })
    }

    /// Handle of the registered attribute.
    pub fn attribute(&self) -> H::Attribute {
        self.pressure
    }

    /// Current value as seen by the host.
    pub fn pressure(&self, host: &H) -> f32 {
        host.attr_read(self.pressure)
    }
}
