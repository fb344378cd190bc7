//! Resolving a sensor address to a device handle.

use tracing::{debug, info};

use crate::ble::{BleAdapter, BleDevice, DiscoveryFilter};
use crate::config::PollConfig;
use crate::error::{after_release, Error, Result, Stage};
use crate::poll::PollError;

/// Find the device with the given address, discovering it if the adapter does not know it yet.
///
/// Powers the adapter on and scopes discovery to the plant sensor service. If
/// discovery has to run it is always stopped again before this returns.
pub async fn locate<A: BleAdapter>(
    adapter: &A,
    address: &str,
    config: &PollConfig,
) -> Result<A::Device> {
    adapter
        .set_powered(true)
        .await
        .map_err(Error::io(Stage::PowerOn))?;
    adapter
        .set_discovery_filter(&DiscoveryFilter::plant_sensor())
        .await
        .map_err(Error::io(Stage::DiscoveryFilter))?;

    let known = adapter
        .get_devices(address)
        .await
        .map_err(Error::io(Stage::DeviceLookup))?;
    if let Some(device) = known.into_iter().next() {
        debug!("{address} already known to adapter");
        return Ok(device);
    }

    adapter
        .start_discovery()
        .await
        .map_err(Error::io(Stage::StartDiscovery))?;
    info!("discovering {address}");

    let found = adapter
        .wait_for_device(address, &config.discovery_options())
        .await
        .map_err(|err| match err {
            PollError::TimedOut { waited } => Error::DiscoveryTimeout {
                address: address.to_string(),
                waited,
            },
            PollError::Exhausted => Error::DeviceNotFound {
                address: address.to_string(),
            },
            PollError::Backend(source) => Error::Io {
                stage: Stage::Discovery,
                source,
            },
        });

    let stopped = adapter.stop_discovery().await;
    info!("stopped discovery");

    let device = after_release(found, stopped, Stage::StopDiscovery)?;
    debug!("discovered {}", device.address());
    Ok(device)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ble::Transport;
    use crate::error::FailureCategory;
    use crate::message::SERVICE_UUID;
    use crate::mock::{MockAdapter, MockDevice};

    const ADDRESS: &str = "C4:7C:8D:6A:3E:01";

    fn config() -> PollConfig {
        PollConfig::default().discovery_timeout(Some(Duration::from_secs(1)))
    }

    #[tokio::test(start_paused = true)]
    async fn known_device_skips_discovery() {
        let adapter = MockAdapter::new();
        adapter.add_known(MockDevice::new(ADDRESS));

        let device = locate(&adapter, ADDRESS, &config()).await.unwrap();

        assert_eq!(device.address(), ADDRESS);
        assert!(adapter.is_powered());
        assert_eq!(
            adapter.discovery_filter(),
            Some(DiscoveryFilter {
                service_ids: vec![SERVICE_UUID],
                transport: Transport::Le,
            })
        );
        assert_eq!(adapter.start_discovery_count(), 0);
        assert_eq!(adapter.stop_discovery_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn discovers_device_and_stops_discovery() {
        let adapter = MockAdapter::new();
        adapter.add_discoverable(MockDevice::new(ADDRESS), 3);

        let device = locate(&adapter, ADDRESS, &config()).await.unwrap();

        assert_eq!(device.address(), ADDRESS);
        assert_eq!(adapter.start_discovery_count(), 1);
        assert_eq!(adapter.stop_discovery_count(), 1);
        assert!(!adapter.is_discovering());
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_timeout_still_stops_discovery() {
        let adapter = MockAdapter::new();

        let err = locate(&adapter, ADDRESS, &config()).await.unwrap_err();

        assert!(
            matches!(err, Error::DiscoveryTimeout { ref address, waited } if address == ADDRESS && waited == Duration::from_secs(1))
        );
        assert_eq!(adapter.start_discovery_count(), 1);
        assert_eq!(adapter.stop_discovery_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_scan_is_not_found() {
        let adapter = MockAdapter::new();
        adapter.exhaust_discovery();

        let err = locate(&adapter, ADDRESS, &config()).await.unwrap_err();

        assert!(matches!(err, Error::DeviceNotFound { .. }));
        assert_eq!(adapter.stop_discovery_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_failure_does_not_mask_timeout() {
        let adapter = MockAdapter::new();
        adapter.fail_stop_discovery();

        let err = locate(&adapter, ADDRESS, &config()).await.unwrap_err();

        assert!(matches!(err, Error::DiscoveryTimeout { .. }));
        assert_eq!(adapter.stop_discovery_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_failure_after_discovery_is_reported() {
        let adapter = MockAdapter::new();
        adapter.add_discoverable(MockDevice::new(ADDRESS), 0);
        adapter.fail_stop_discovery();

        let err = locate(&adapter, ADDRESS, &config()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Cleanup {
                stage: Stage::StopDiscovery,
                ..
            }
        ));
        assert_eq!(err.category(), FailureCategory::Adapter);
    }

    #[tokio::test(start_paused = true)]
    async fn power_failure_never_touches_discovery() {
        let adapter = MockAdapter::new();
        adapter.fail_power();

        let err = locate(&adapter, ADDRESS, &config()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Io {
                stage: Stage::PowerOn,
                ..
            }
        ));
        assert_eq!(adapter.start_discovery_count(), 0);
        assert_eq!(adapter.stop_discovery_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn filter_failure_never_touches_discovery() {
        let adapter = MockAdapter::new();
        adapter.fail_discovery_filter();

        let err = locate(&adapter, ADDRESS, &config()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Io {
                stage: Stage::DiscoveryFilter,
                ..
            }
        ));
        assert_eq!(err.category(), FailureCategory::Adapter);
        assert_eq!(adapter.start_discovery_count(), 0);
        assert_eq!(adapter.stop_discovery_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_failure_never_touches_discovery() {
        let adapter = MockAdapter::new();
        adapter.add_known(MockDevice::new(ADDRESS));
        adapter.fail_lookup();

        let err = locate(&adapter, ADDRESS, &config()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Io {
                stage: Stage::DeviceLookup,
                ..
            }
        ));
        assert_eq!(err.category(), FailureCategory::Adapter);
        assert_eq!(adapter.start_discovery_count(), 0);
        assert_eq!(adapter.stop_discovery_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_failure_is_reported_without_stop() {
        let adapter = MockAdapter::new();
        adapter.fail_start_discovery();

        let err = locate(&adapter, ADDRESS, &config()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Io {
                stage: Stage::StartDiscovery,
                ..
            }
        ));
        assert_eq!(adapter.stop_discovery_count(), 0);
    }
}
