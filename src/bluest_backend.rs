//! The [`ble`](crate::ble) traits implemented on top of `bluest`.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bluest::{Adapter, Characteristic, Device, Uuid};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ble::{BackendResult, BleAdapter, BleDevice, DiscoveryFilter, GattCharacteristic, PollOptions};
use crate::error::{Error, Result};
use crate::message::SERVICE_UUID;
use crate::poll::{self, PollError};

#[derive(Default)]
struct ScanState {
    services: Vec<Uuid>,
    discovered: Vec<Device>,
    task: Option<JoinHandle<()>>,
    finished: bool,
    error: Option<String>,
}

fn lock(state: &Mutex<ScanState>) -> MutexGuard<'_, ScanState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keep only the hex digits of an address so `c4:7c:…` and `C47C…` compare equal.
fn normalize(address: &str) -> String {
    address
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn same_address(id: &str, address: &str) -> bool {
    let wanted = normalize(address);
    !wanted.is_empty() && normalize(id) == wanted
}

fn matches_address(device: &Device, address: &str) -> bool {
    same_address(&device.id().to_string(), address)
}

/// A host Bluetooth adapter. Clones share discovery state.
#[derive(Clone)]
pub struct BluestAdapter {
    adapter: Adapter,
    scan: Arc<Mutex<ScanState>>,
}

impl fmt::Debug for BluestAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scan = lock(&self.scan);
        f.debug_struct("BluestAdapter")
            .field("services", &scan.services)
            .field("discovered", &scan.discovered.len())
            .field("scanning", &scan.task.is_some())
            .finish_non_exhaustive()
    }
}

impl BluestAdapter {
    pub fn new(adapter: Adapter) -> Self {
        Self {
            adapter,
            scan: Arc::default(),
        }
    }

    /// Open the system's default adapter.
    pub async fn default_adapter() -> Result<Self> {
        let adapter = Adapter::default().await.ok_or(Error::AdapterUnavailable)?;
        Ok(Self::new(adapter))
    }

    fn wrap(&self, device: Device, address: &str) -> BluestDevice {
        BluestDevice {
            adapter: self.adapter.clone(),
            device,
            address: address.to_string(),
        }
    }
}

#[async_trait]
impl BleAdapter for BluestAdapter {
    type Device = BluestDevice;

    async fn set_powered(&self, powered: bool) -> BackendResult<()> {
        if !powered {
            return Err("powering the adapter off is not supported".into());
        }
        self.adapter.wait_available().await?;
        Ok(())
    }

    async fn set_discovery_filter(&self, filter: &DiscoveryFilter) -> BackendResult<()> {
        // bluest only scans for low-energy advertisements, so the transport needs no mapping.
        debug!("discovery filter: {:?}", filter);
        lock(&self.scan).services = filter.service_ids.clone();
        Ok(())
    }

    async fn get_devices(&self, address: &str) -> BackendResult<Vec<BluestDevice>> {
        let (services, discovered) = {
            let scan = lock(&self.scan);
            let discovered: Vec<Device> = scan
                .discovered
                .iter()
                .filter(|d| matches_address(d, address))
                .cloned()
                .collect();
            (scan.services.clone(), discovered)
        };
        if !discovered.is_empty() {
            return Ok(discovered.into_iter().map(|d| self.wrap(d, address)).collect());
        }

        let connected = if services.is_empty() {
            self.adapter.connected_devices().await?
        } else {
            self.adapter.connected_devices_with_services(&services).await?
        };
        Ok(connected
            .into_iter()
            .filter(|d| matches_address(d, address))
            .map(|d| self.wrap(d, address))
            .collect())
    }

    async fn start_discovery(&self) -> BackendResult<()> {
        let adapter = self.adapter.clone();
        let shared = self.scan.clone();
        let services = {
            let mut scan = lock(&self.scan);
            scan.discovered.clear();
            scan.finished = false;
            scan.error = None;
            scan.services.clone()
        };

        let task = tokio::spawn(async move {
            let mut events = match adapter.scan(&services).await {
                Ok(events) => events,
                Err(err) => {
                    warn!("scan failed: {err}");
                    let mut scan = lock(&shared);
                    scan.error = Some(err.to_string());
                    scan.finished = true;
                    return;
                }
            };
            while let Some(advertising) = events.next().await {
                debug!("advertisement from {:?}", advertising.device.id());
                let mut scan = lock(&shared);
                if !scan.discovered.contains(&advertising.device) {
                    scan.discovered.push(advertising.device);
                }
            }
            lock(&shared).finished = true;
        });

        if let Some(previous) = lock(&self.scan).task.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    async fn stop_discovery(&self) -> BackendResult<()> {
        if let Some(task) = lock(&self.scan).task.take() {
            task.abort();
        }
        Ok(())
    }

    async fn wait_for_device(
        &self,
        address: &str,
        options: &PollOptions,
    ) -> std::result::Result<BluestDevice, PollError> {
        poll::wait_for(options, move || async move {
            let devices: Vec<BluestDevice> = self.get_devices(address).await?;
            if let Some(device) = devices.into_iter().next() {
                return Ok(Some(device));
            }
            let (error, finished) = {
                let scan = lock(&self.scan);
                (scan.error.clone(), scan.finished)
            };
            match (error, finished) {
                (Some(error), _) => Err(PollError::Backend(error.into())),
                (None, true) => Err(PollError::Exhausted),
                (None, false) => Ok::<_, PollError>(None),
            }
        })
        .await
    }
}

/// A peripheral reached through a [`BluestAdapter`].
#[derive(Clone)]
pub struct BluestDevice {
    adapter: Adapter,
    device: Device,
    address: String,
}

impl fmt::Debug for BluestDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BluestDevice")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BleDevice for BluestDevice {
    type Characteristic = Characteristic;

    fn address(&self) -> String {
        self.address.clone()
    }

    async fn connect(&self) -> BackendResult<()> {
        self.adapter.connect_device(&self.device).await?;
        Ok(())
    }

    async fn disconnect(&self) -> BackendResult<()> {
        self.adapter.disconnect_device(&self.device).await?;
        Ok(())
    }

    async fn gatt_characteristic(&self, uuid: Uuid) -> BackendResult<Option<Characteristic>> {
        for service in self.device.discover_services_with_uuid(SERVICE_UUID).await? {
            let found = service.discover_characteristics_with_uuid(uuid).await?;
            if let Some(characteristic) = found.into_iter().next() {
                return Ok(Some(characteristic));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl GattCharacteristic for Characteristic {
    fn uuid(&self) -> Uuid {
        Characteristic::uuid(self)
    }

    async fn read_value(&self) -> BackendResult<Vec<u8>> {
        Ok(self.read().await?)
    }

    async fn write_value(&self, value: &[u8]) -> BackendResult<()> {
        Ok(self.write(value).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_ignores_case_and_separators() {
        assert_eq!(normalize("c4:7c:8d:6a:3e:01"), "C47C8D6A3E01");
        assert_eq!(normalize("C4-7C-8D-6A-3E-01"), "C47C8D6A3E01");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn address_must_match_whole_id() {
        assert!(same_address("C4:7C:8D:6A:3E:01", "c4-7c-8d-6a-3e-01"));
        assert!(!same_address("C4:7C:8D:6A:3E:01:FF", "C4:7C:8D:6A:3E:01"));
        assert!(!same_address("DeviceId(C4:7C:8D:6A:3E:01)", "C4:7C:8D:6A:3E:01"));
        assert!(!same_address("", ""));
    }
}
