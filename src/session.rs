//! One locate → connect → read → disconnect pass against a sensor.
//!
//! Once a connection is open it is closed exactly once before the operation
//! returns, whether the characteristic I/O and decoding succeeded or not. A
//! failing disconnect never replaces the error that came before it.

use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use crate::ble::{BleAdapter, BleDevice, GattCharacteristic};
use crate::config::PollConfig;
use crate::error::{after_release, Error, Result, Stage};
use crate::locator::locate;
use crate::message::{
    decode_properties, decode_sensor_data, DATA_CHARACTERISTIC, MODE_CHARACTERISTIC,
    PROPERTIES_CHARACTERISTIC, REQUEST_LIVE_DATA,
};
use crate::poll::PollError;
use crate::sensor_reading::{SensorData, SensorProperties};

/// Trigger a live measurement and read it.
pub async fn read_data<A: BleAdapter>(
    adapter: &A,
    address: &str,
    config: &PollConfig,
) -> Result<SensorData> {
    let device = connect(adapter, address, config).await?;
    let outcome = fetch_data(&device, config).await;
    release(&device, outcome).await
}

/// Read battery level and firmware version.
pub async fn read_properties<A: BleAdapter>(
    adapter: &A,
    address: &str,
    config: &PollConfig,
) -> Result<SensorProperties> {
    let device = connect(adapter, address, config).await?;
    let outcome = fetch_properties(&device, config).await;
    release(&device, outcome).await
}

async fn connect<A: BleAdapter>(adapter: &A, address: &str, config: &PollConfig) -> Result<A::Device> {
    let device = locate(adapter, address, config).await?;
    device
        .connect()
        .await
        .map_err(|source| Error::ConnectionFailed {
            address: address.to_string(),
            source,
        })?;
    debug!("connected to {address}");
    Ok(device)
}

async fn release<D: BleDevice, T>(device: &D, outcome: Result<T>) -> Result<T> {
    let disconnected = device.disconnect().await;
    debug!("disconnected from {}", device.address());
    after_release(outcome, disconnected, Stage::Disconnect)
}

async fn fetch_data<D: BleDevice>(device: &D, config: &PollConfig) -> Result<SensorData> {
    let mode = characteristic(device, MODE_CHARACTERISTIC, config).await?;
    debug!("TX: 0x{}", hex::encode(REQUEST_LIVE_DATA));
    mode.write_value(&REQUEST_LIVE_DATA)
        .await
        .map_err(Error::io(Stage::Write))?;

    let data = characteristic(device, DATA_CHARACTERISTIC, config).await?;
    let payload = data.read_value().await.map_err(Error::io(Stage::Read))?;
    debug!("RX: 0x{}", hex::encode(&payload));

    Ok(decode_sensor_data(&payload)?)
}

async fn fetch_properties<D: BleDevice>(device: &D, config: &PollConfig) -> Result<SensorProperties> {
    let properties = characteristic(device, PROPERTIES_CHARACTERISTIC, config).await?;
    let payload = properties
        .read_value()
        .await
        .map_err(Error::io(Stage::Read))?;
    debug!("RX: 0x{}", hex::encode(&payload));

    Ok(decode_properties(&payload)?)
}

async fn characteristic<D: BleDevice>(
    device: &D,
    uuid: Uuid,
    config: &PollConfig,
) -> Result<D::Characteristic> {
    device
        .wait_for_gatt_characteristic(uuid, &config.characteristic_options())
        .await
        .map_err(|err| match err {
            PollError::TimedOut { waited } => Error::CharacteristicTimeout { uuid, waited },
            PollError::Exhausted => Error::CharacteristicTimeout {
                uuid,
                waited: Duration::ZERO,
            },
            PollError::Backend(source) => Error::Io {
                stage: Stage::CharacteristicLookup,
                source,
            },
        })
}
