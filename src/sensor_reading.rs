use std::fmt;

/// A live reading taken from the plant sensor
#[derive(Debug, Clone, PartialEq)]
pub struct SensorData {
    /// Temperature in °C, with a resolution of 0.1
    pub temperature: f32,
    /// Illuminance in lx
    pub illuminance: u32,
    /// Soil moisture in %
    pub moisture: u8,
    /// Soil conductivity in µS/cm
    pub conductivity: u16,
}

/// Properties reported by the plant sensor itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorProperties {
    /// Battery level in %
    pub battery_level: u8,
    pub firmware_version: String,
}

impl fmt::Display for SensorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} °C, {} lx, {} %, {} µS/cm",
            self.temperature, self.illuminance, self.moisture, self.conductivity
        )
    }
}

impl fmt::Display for SensorProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "battery {} %, firmware {}", self.battery_level, self.firmware_version)
    }
}
