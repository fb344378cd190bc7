//! Error types for the plant sensor client.
//!
//! Every failure names the pipeline [`Stage`] it happened in, and collaborator
//! errors are carried unmodified as their `source`. Use [`Error::category`] to
//! decide what an operator should do about a failure.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// An error reported by the BLE adapter/device collaborator.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The step of a read operation at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PowerOn,
    DiscoveryFilter,
    DeviceLookup,
    StartDiscovery,
    Discovery,
    StopDiscovery,
    Connect,
    CharacteristicLookup,
    Write,
    Read,
    Disconnect,
}

impl Stage {
    /// Whether this step only involves the local adapter, not the sensor.
    fn is_adapter(self) -> bool {
        matches!(
            self,
            Stage::PowerOn
                | Stage::DiscoveryFilter
                | Stage::DeviceLookup
                | Stage::StartDiscovery
                | Stage::Discovery
                | Stage::StopDiscovery
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::PowerOn => "power on",
            Stage::DiscoveryFilter => "set discovery filter",
            Stage::DeviceLookup => "device lookup",
            Stage::StartDiscovery => "start discovery",
            Stage::Discovery => "discovery",
            Stage::StopDiscovery => "stop discovery",
            Stage::Connect => "connect",
            Stage::CharacteristicLookup => "characteristic lookup",
            Stage::Write => "write",
            Stage::Read => "read",
            Stage::Disconnect => "disconnect",
        };
        f.write_str(name)
    }
}

/// A payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer is shorter than the fixed wire layout requires.
    #[error("{kind} payload requires at least {expected} bytes, got {actual}")]
    TooShort {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Errors that can occur while reading from a plant sensor.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No BLE adapter is available on this host.
    #[error("Bluetooth adapter unavailable")]
    AdapterUnavailable,

    /// Discovery ended without the device showing up.
    #[error("Device not found: {address}")]
    DeviceNotFound { address: String },

    /// The device did not show up before the discovery deadline.
    #[error("Device {address} not discovered within {waited:?}")]
    DiscoveryTimeout { address: String, waited: Duration },

    /// The device was found but the connection attempt failed.
    #[error("Failed to connect to {address}: {source}")]
    ConnectionFailed {
        address: String,
        #[source]
        source: BackendError,
    },

    /// A GATT characteristic did not become available in time.
    #[error("Characteristic {uuid} not available within {waited:?}")]
    CharacteristicTimeout { uuid: Uuid, waited: Duration },

    /// The collaborator failed at the given stage.
    #[error("Bluetooth {stage} failed: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: BackendError,
    },

    /// The payload read from the device was malformed.
    #[error("Invalid payload: {0}")]
    Decode(#[from] DecodeError),

    /// The operation succeeded but releasing the adapter or device afterwards failed.
    #[error("Cleanup ({stage}) failed: {source}")]
    Cleanup {
        stage: Stage,
        #[source]
        source: BackendError,
    },

    /// The client configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// What kind of response a failure calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// The local adapter is missing or misbehaving.
    Adapter,
    /// The sensor could not be reached; move it closer or check its battery.
    Unreachable,
    /// The sensor was reached but talking to it failed.
    ReadFailed,
    /// The sensor answered with data that does not match the known layout.
    MalformedPayload,
    /// The caller supplied an unusable configuration.
    Configuration,
}

impl Error {
    /// Classify this error for the operator.
    pub fn category(&self) -> FailureCategory {
        match self {
            Error::AdapterUnavailable => FailureCategory::Adapter,
            Error::Io { stage, .. } | Error::Cleanup { stage, .. } if stage.is_adapter() => {
                FailureCategory::Adapter
            }
            Error::DeviceNotFound { .. }
            | Error::DiscoveryTimeout { .. }
            | Error::ConnectionFailed { .. } => FailureCategory::Unreachable,
            Error::CharacteristicTimeout { .. } | Error::Io { .. } | Error::Cleanup { .. } => {
                FailureCategory::ReadFailed
            }
            Error::Decode(_) => FailureCategory::MalformedPayload,
            Error::InvalidConfig(_) => FailureCategory::Configuration,
        }
    }

    pub(crate) fn io(stage: Stage) -> impl FnOnce(BackendError) -> Error {
        move |source| Error::Io { stage, source }
    }
}

/// Combine the outcome of an operation with the outcome of the release step that followed it.
///
/// A release failure never hides the operation's own error. It is logged instead.
pub(crate) fn after_release<T>(
    outcome: Result<T>,
    release: std::result::Result<(), BackendError>,
    stage: Stage,
) -> Result<T> {
    match (outcome, release) {
        (outcome, Ok(())) => outcome,
        (Ok(_), Err(source)) => Err(Error::Cleanup { stage, source }),
        (Err(err), Err(source)) => {
            warn!("{stage} after failed operation also failed: {source}");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(msg: &str) -> BackendError {
        msg.to_string().into()
    }

    #[test]
    fn release_failure_after_success_is_reported() {
        let result = after_release(Ok(1), Err(backend("gone")), Stage::Disconnect);
        match result {
            Err(Error::Cleanup { stage, source }) => {
                assert_eq!(stage, Stage::Disconnect);
                assert_eq!(source.to_string(), "gone");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn release_failure_keeps_original_error() {
        let original: Result<()> = Err(Error::DeviceNotFound {
            address: "C4:7C:8D:00:00:01".into(),
        });
        let result = after_release(original, Err(backend("gone")), Stage::StopDiscovery);
        assert!(matches!(result, Err(Error::DeviceNotFound { .. })));
    }

    #[test]
    fn categories_separate_reach_read_and_payload() {
        let not_found = Error::DiscoveryTimeout {
            address: "x".into(),
            waited: Duration::from_secs(1),
        };
        let read = Error::Io {
            stage: Stage::Read,
            source: backend("eio"),
        };
        let decode = Error::Decode(DecodeError::TooShort {
            kind: "sensor data",
            expected: 10,
            actual: 3,
        });
        assert_eq!(not_found.category(), FailureCategory::Unreachable);
        assert_eq!(read.category(), FailureCategory::ReadFailed);
        assert_eq!(decode.category(), FailureCategory::MalformedPayload);
        assert_eq!(
            Error::io(Stage::PowerOn)(backend("off")).category(),
            FailureCategory::Adapter
        );
    }

    #[test]
    fn cleanup_is_categorised_by_stage() {
        let stop = Error::Cleanup {
            stage: Stage::StopDiscovery,
            source: backend("busy"),
        };
        let disconnect = Error::Cleanup {
            stage: Stage::Disconnect,
            source: backend("busy"),
        };
        assert_eq!(stop.category(), FailureCategory::Adapter);
        assert_eq!(disconnect.category(), FailureCategory::ReadFailed);
    }
}
