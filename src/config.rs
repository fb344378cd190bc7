//! Polling and timeout configuration.

use std::time::Duration;

use crate::ble::PollOptions;
use crate::error::{Error, Result};

/// Default cadence for re-checking whether a device or characteristic has appeared.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default time to wait for the sensor to show up during discovery.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time to wait for a GATT characteristic after connecting.
pub const DEFAULT_CHARACTERISTIC_TIMEOUT: Duration = Duration::from_secs(10);

/// How a [`PlantSensor`](crate::PlantSensor) polls the adapter.
///
/// ```
/// use std::time::Duration;
/// use miflora::PollConfig;
///
/// let config = PollConfig::default()
///     .poll_interval(Duration::from_millis(100))
///     .discovery_timeout(Some(Duration::from_secs(60)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two checks of a pending condition.
    pub poll_interval: Duration,
    /// Upper bound on waiting for the device to be discovered, `None` waits forever.
    pub discovery_timeout: Option<Duration>,
    /// Upper bound on waiting for each characteristic, `None` waits forever.
    pub characteristic_timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            discovery_timeout: Some(DEFAULT_DISCOVERY_TIMEOUT),
            characteristic_timeout: Some(DEFAULT_CHARACTERISTIC_TIMEOUT),
        }
    }
}

impl PollConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll without any deadline. Waits only end when the condition is met or the backend fails.
    pub fn without_timeouts() -> Self {
        Self {
            discovery_timeout: None,
            characteristic_timeout: None,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    #[must_use]
    pub fn characteristic_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.characteristic_timeout = timeout;
        self
    }

    /// Reject configurations that would spin without yielding.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn discovery_options(&self) -> PollOptions {
        PollOptions {
            poll_interval: self.poll_interval,
            timeout: self.discovery_timeout,
        }
    }

    pub fn characteristic_options(&self) -> PollOptions {
        PollOptions {
            poll_interval: self.poll_interval,
            timeout: self.characteristic_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_polls_every_50ms() {
        let config = PollConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.discovery_options().timeout, Some(DEFAULT_DISCOVERY_TIMEOUT));
        assert_eq!(
            config.characteristic_options().timeout,
            Some(DEFAULT_CHARACTERISTIC_TIMEOUT)
        );
    }

    #[test]
    fn without_timeouts_keeps_interval() {
        let config = PollConfig::without_timeouts().poll_interval(Duration::from_millis(5));
        assert_eq!(config.discovery_options().timeout, None);
        assert_eq!(config.characteristic_options().poll_interval, Duration::from_millis(5));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = PollConfig::default().poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
