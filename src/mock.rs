//! In-memory BLE stack for testing without hardware.
//!
//! [`MockAdapter`], [`MockDevice`] and [`MockCharacteristic`] implement the
//! [`crate::ble`] traits, count every call that matters for cleanup and can be
//! told to fail at any step.
//!
//! ```
//! use miflora::mock::{MockAdapter, MockDevice};
//! use miflora::PlantSensor;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let device = MockDevice::plant_sensor(
//!     "C4:7C:8D:6A:3E:01",
//!     &[0xd1, 0x00, 0x00, 0x6d, 0x02, 0x00, 0x00, 0x32, 0x4e, 0x01],
//!     &[0x5a, 0x00, 0x31, 0x2e, 0x30, 0x2e, 0x30],
//! );
//! let adapter = MockAdapter::new();
//! adapter.add_known(device.clone());
//!
//! let sensor = PlantSensor::new(adapter, "C4:7C:8D:6A:3E:01");
//! let data = sensor.get_data().await.unwrap();
//! assert_eq!(data.moisture, 50);
//! assert_eq!(device.disconnect_count(), 1);
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::ble::{BackendResult, BleAdapter, BleDevice, DiscoveryFilter, GattCharacteristic, PollOptions};
use crate::message::{DATA_CHARACTERISTIC, MODE_CHARACTERISTIC, PROPERTIES_CHARACTERISTIC};
use crate::poll::{self, PollError};

/// Failure injected into the mock stack.
#[derive(Debug, Clone, Error)]
#[error("mock {0} failure")]
pub struct MockError(pub &'static str);

fn fail<T>(what: &'static str) -> BackendResult<T> {
    Err(Box::new(MockError(what)))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct AdapterState {
    powered: bool,
    discovering: bool,
    filter: Option<DiscoveryFilter>,
    known: Vec<MockDevice>,
    discoverable: Vec<(MockDevice, u32)>,
    discovery_polls: u32,
    exhausted: bool,
    start_discovery_count: u32,
    stop_discovery_count: u32,
    fail_power: bool,
    fail_filter: bool,
    fail_lookup: bool,
    fail_start_discovery: bool,
    fail_stop_discovery: bool,
}

/// A fake adapter. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockAdapter {
    state: Arc<Mutex<AdapterState>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, AdapterState> {
        lock(&self.state)
    }

    /// Make a device known to the adapter without discovery.
    pub fn add_known(&self, device: MockDevice) {
        self.state().known.push(device);
    }

    /// Make a device show up on the given discovery poll (0 = the first one).
    pub fn add_discoverable(&self, device: MockDevice, after_polls: u32) {
        self.state().discoverable.push((device, after_polls));
    }

    /// Make discovery report that no further devices will show up.
    pub fn exhaust_discovery(&self) {
        self.state().exhausted = true;
    }

    pub fn fail_power(&self) {
        self.state().fail_power = true;
    }

    pub fn fail_discovery_filter(&self) {
        self.state().fail_filter = true;
    }

    pub fn fail_lookup(&self) {
        self.state().fail_lookup = true;
    }

    pub fn fail_start_discovery(&self) {
        self.state().fail_start_discovery = true;
    }

    pub fn fail_stop_discovery(&self) {
        self.state().fail_stop_discovery = true;
    }

    pub fn is_powered(&self) -> bool {
        self.state().powered
    }

    pub fn is_discovering(&self) -> bool {
        self.state().discovering
    }

    pub fn discovery_filter(&self) -> Option<DiscoveryFilter> {
        self.state().filter.clone()
    }

    pub fn start_discovery_count(&self) -> u32 {
        self.state().start_discovery_count
    }

    pub fn stop_discovery_count(&self) -> u32 {
        self.state().stop_discovery_count
    }
}

#[async_trait]
impl BleAdapter for MockAdapter {
    type Device = MockDevice;

    async fn set_powered(&self, powered: bool) -> BackendResult<()> {
        let mut state = self.state();
        if state.fail_power {
            return fail("power");
        }
        state.powered = powered;
        Ok(())
    }

    async fn set_discovery_filter(&self, filter: &DiscoveryFilter) -> BackendResult<()> {
        let mut state = self.state();
        if state.fail_filter {
            return fail("discovery filter");
        }
        state.filter = Some(filter.clone());
        Ok(())
    }

    async fn get_devices(&self, address: &str) -> BackendResult<Vec<MockDevice>> {
        let mut state = self.state();
        if state.fail_lookup {
            return fail("device lookup");
        }
        let mut devices: Vec<MockDevice> = state
            .known
            .iter()
            .filter(|d| d.address() == address)
            .cloned()
            .collect();
        if state.discovering {
            state.discovery_polls += 1;
            let polls = state.discovery_polls;
            devices.extend(
                state
                    .discoverable
                    .iter()
                    .filter(|(d, after)| polls > *after && d.address() == address)
                    .map(|(d, _)| d.clone()),
            );
        }
        Ok(devices)
    }

    async fn start_discovery(&self) -> BackendResult<()> {
        let mut state = self.state();
        state.start_discovery_count += 1;
        if state.fail_start_discovery {
            return fail("start discovery");
        }
        state.discovering = true;
        state.discovery_polls = 0;
        Ok(())
    }

    async fn stop_discovery(&self) -> BackendResult<()> {
        let mut state = self.state();
        state.stop_discovery_count += 1;
        state.discovering = false;
        if state.fail_stop_discovery {
            return fail("stop discovery");
        }
        Ok(())
    }

    async fn wait_for_device(
        &self,
        address: &str,
        options: &PollOptions,
    ) -> Result<MockDevice, PollError> {
        poll::wait_for(options, move || async move {
            let devices: Vec<MockDevice> = self.get_devices(address).await?;
            if let Some(device) = devices.into_iter().next() {
                return Ok(Some(device));
            }
            if self.state().exhausted {
                return Err(PollError::Exhausted);
            }
            Ok::<_, PollError>(None)
        })
        .await
    }
}

#[derive(Debug, Default)]
struct DeviceState {
    connected: bool,
    connect_count: u32,
    disconnect_count: u32,
    characteristics: HashMap<Uuid, MockCharacteristic>,
    fail_connect: bool,
    fail_disconnect: bool,
    fail_characteristic_lookup: bool,
    stall_characteristic_lookup: bool,
}

/// A fake peripheral. Clones share state.
#[derive(Debug, Clone)]
pub struct MockDevice {
    address: String,
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    /// A device exposing no characteristics.
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            state: Arc::default(),
        }
    }

    /// A device exposing the three plant sensor characteristics with fixed payloads.
    pub fn plant_sensor(address: &str, data: &[u8], properties: &[u8]) -> Self {
        let device = Self::new(address);
        device.add_characteristic(MockCharacteristic::new(MODE_CHARACTERISTIC, &[]));
        device.add_characteristic(MockCharacteristic::new(DATA_CHARACTERISTIC, data));
        device.add_characteristic(MockCharacteristic::new(PROPERTIES_CHARACTERISTIC, properties));
        device
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        lock(&self.state)
    }

    pub fn add_characteristic(&self, characteristic: MockCharacteristic) {
        self.state()
            .characteristics
            .insert(characteristic.uuid(), characteristic);
    }

    /// Remove a characteristic so waiting for it never succeeds.
    pub fn remove_characteristic(&self, uuid: Uuid) {
        self.state().characteristics.remove(&uuid);
    }

    pub fn characteristic(&self, uuid: Uuid) -> Option<MockCharacteristic> {
        self.state().characteristics.get(&uuid).cloned()
    }

    pub fn fail_connect(&self) {
        self.state().fail_connect = true;
    }

    pub fn fail_disconnect(&self) {
        self.state().fail_disconnect = true;
    }

    pub fn fail_characteristic_lookup(&self) {
        self.state().fail_characteristic_lookup = true;
    }

    /// Make characteristic lookups never complete.
    pub fn stall_characteristic_lookup(&self) {
        self.state().stall_characteristic_lookup = true;
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub fn connect_count(&self) -> u32 {
        self.state().connect_count
    }

    pub fn disconnect_count(&self) -> u32 {
        self.state().disconnect_count
    }
}

#[async_trait]
impl BleDevice for MockDevice {
    type Characteristic = MockCharacteristic;

    fn address(&self) -> String {
        self.address.clone()
    }

    async fn connect(&self) -> BackendResult<()> {
        let mut state = self.state();
        state.connect_count += 1;
        if state.fail_connect {
            return fail("connect");
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> BackendResult<()> {
        let mut state = self.state();
        state.disconnect_count += 1;
        state.connected = false;
        if state.fail_disconnect {
            return fail("disconnect");
        }
        Ok(())
    }

    async fn gatt_characteristic(&self, uuid: Uuid) -> BackendResult<Option<MockCharacteristic>> {
        let (stall, found) = {
            let state = self.state();
            if state.fail_characteristic_lookup {
                return fail("characteristic lookup");
            }
            let found = if state.connected {
                state.characteristics.get(&uuid).cloned()
            } else {
                None
            };
            (state.stall_characteristic_lookup, found)
        };
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(found)
    }
}

#[derive(Debug, Default)]
struct CharacteristicState {
    value: Vec<u8>,
    writes: Vec<Vec<u8>>,
    read_count: u32,
    fail_read: bool,
    fail_write: bool,
}

/// A fake characteristic holding a fixed value. Clones share state.
#[derive(Debug, Clone)]
pub struct MockCharacteristic {
    uuid: Uuid,
    state: Arc<Mutex<CharacteristicState>>,
}

impl MockCharacteristic {
    pub fn new(uuid: Uuid, value: &[u8]) -> Self {
        Self {
            uuid,
            state: Arc::new(Mutex::new(CharacteristicState {
                value: value.to_vec(),
                ..CharacteristicState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, CharacteristicState> {
        lock(&self.state)
    }

    pub fn set_value(&self, value: &[u8]) {
        self.state().value = value.to_vec();
    }

    pub fn fail_read(&self) {
        self.state().fail_read = true;
    }

    pub fn fail_write(&self) {
        self.state().fail_write = true;
    }

    /// Every value written so far, oldest first.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    pub fn read_count(&self) -> u32 {
        self.state().read_count
    }
}

#[async_trait]
impl GattCharacteristic for MockCharacteristic {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn read_value(&self) -> BackendResult<Vec<u8>> {
        let mut state = self.state();
        state.read_count += 1;
        if state.fail_read {
            return fail("read");
        }
        Ok(state.value.clone())
    }

    async fn write_value(&self, value: &[u8]) -> BackendResult<()> {
        let mut state = self.state();
        if state.fail_write {
            return fail("write");
        }
        state.writes.push(value.to_vec());
        Ok(())
    }
}
