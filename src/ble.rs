//! The BLE stack this crate drives, expressed as traits.
//!
//! A real backend (see `bluest_backend`) and the fakes in [`crate::mock`] both
//! implement these, so the locate/connect/read pipeline never touches a radio
//! directly.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::BackendError;
use crate::message::SERVICE_UUID;
use crate::poll::{self, PollError};

pub type BackendResult<T> = Result<T, BackendError>;

/// Which radio transport discovery should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Auto,
    BrEdr,
    Le,
}

/// Constraints applied to the adapter's scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryFilter {
    pub service_ids: Vec<Uuid>,
    pub transport: Transport,
}

impl DiscoveryFilter {
    /// Only low-energy peripherals advertising the plant sensor service.
    pub fn plant_sensor() -> Self {
        Self {
            service_ids: vec![SERVICE_UUID],
            transport: Transport::Le,
        }
    }
}

/// Cadence and bound of a polling wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub poll_interval: Duration,
    /// `None` waits until the condition is met or the backend gives up.
    pub timeout: Option<Duration>,
}

/// A local BLE radio.
///
/// Callers sharing one adapter between several clients must serialize their
/// use of it: filter changes and connection attempts are not safe to
/// interleave on the same radio.
#[async_trait]
pub trait BleAdapter: Send + Sync {
    type Device: BleDevice;

    async fn set_powered(&self, powered: bool) -> BackendResult<()>;

    async fn set_discovery_filter(&self, filter: &DiscoveryFilter) -> BackendResult<()>;

    /// Devices the adapter already knows about with the given address.
    async fn get_devices(&self, address: &str) -> BackendResult<Vec<Self::Device>>;

    async fn start_discovery(&self) -> BackendResult<()>;

    async fn stop_discovery(&self) -> BackendResult<()>;

    /// Wait for a device with the given address to become known.
    ///
    /// The default implementation polls [`BleAdapter::get_devices`].
    async fn wait_for_device(
        &self,
        address: &str,
        options: &PollOptions,
    ) -> Result<Self::Device, PollError> {
        poll::wait_for(options, move || async move {
            Ok::<_, PollError>(self.get_devices(address).await?.into_iter().next())
        })
        .await
    }
}

/// A remote peripheral known to an adapter.
#[async_trait]
pub trait BleDevice: Send + Sync {
    type Characteristic: GattCharacteristic;

    fn address(&self) -> String;

    async fn connect(&self) -> BackendResult<()>;

    async fn disconnect(&self) -> BackendResult<()>;

    /// The characteristic with the given UUID, if the device exposes it yet.
    async fn gatt_characteristic(&self, uuid: Uuid) -> BackendResult<Option<Self::Characteristic>>;

    /// Wait for a characteristic to become available after connecting.
    ///
    /// The default implementation polls [`BleDevice::gatt_characteristic`].
    async fn wait_for_gatt_characteristic(
        &self,
        uuid: Uuid,
        options: &PollOptions,
    ) -> Result<Self::Characteristic, PollError> {
        poll::wait_for(options, move || async move {
            Ok::<_, PollError>(self.gatt_characteristic(uuid).await?)
        })
        .await
    }
}

/// A readable/writable GATT value slot.
#[async_trait]
pub trait GattCharacteristic: Send + Sync {
    fn uuid(&self) -> Uuid;

    async fn read_value(&self) -> BackendResult<Vec<u8>>;

    async fn write_value(&self, value: &[u8]) -> BackendResult<()>;
}
