//! Fixed-layout payloads exchanged with the sensor's GATT characteristics.

pub(crate) mod data_message;
pub(crate) mod properties_message;

use uuid::Uuid;

/// Service advertised by the plant sensor, used to scope discovery
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x00001204_0000_1000_8000_00805f9b34fb);

pub use data_message::{decode_sensor_data, DATA_CHARACTERISTIC, MODE_CHARACTERISTIC, REQUEST_LIVE_DATA};
pub use properties_message::{decode_properties, PROPERTIES_CHARACTERISTIC};
