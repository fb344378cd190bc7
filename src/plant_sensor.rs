use crate::ble::BleAdapter;
use crate::config::PollConfig;
use crate::error::Result;
use crate::sensor_reading::{SensorData, SensorProperties};
use crate::session;

/// A client for one plant sensor, identified by its Bluetooth address.
///
/// Each call locates the device, connects, reads and disconnects again, so a
/// `PlantSensor` holds no connection between calls. Calls that share an
/// adapter with other clients must be serialized by the caller.
#[derive(Debug, Clone)]
pub struct PlantSensor<A> {
    adapter: A,
    address: String,
    config: PollConfig,
}

impl<A: BleAdapter> PlantSensor<A> {
    /// Create a client polling every 50 ms.
    pub fn new(adapter: A, address: impl Into<String>) -> Self {
        Self {
            adapter,
            address: address.into(),
            config: PollConfig::default(),
        }
    }

    /// Create a client with a custom [`PollConfig`].
    pub fn with_config(adapter: A, address: impl Into<String>, config: PollConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            adapter,
            address: address.into(),
            config,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Take a live reading of temperature, illuminance, moisture and conductivity.
    pub async fn get_data(&self) -> Result<SensorData> {
        session::read_data(&self.adapter, &self.address, &self.config).await
    }

    /// Read the battery level and firmware version.
    pub async fn get_properties(&self) -> Result<SensorProperties> {
        session::read_properties(&self.adapter, &self.address, &self.config).await
    }
}
