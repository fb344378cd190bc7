//! Read environmental data from Xiaomi Mi Flora plant sensors over Bluetooth Low Energy
//!
//! The sensor (model HHCCJCY01, advertised as "Flower care") exposes a
//! proprietary GATT service. Writing a mode-change command to one
//! characteristic makes the next read of another return a live measurement.
//! A third characteristic holds the battery level and firmware version.
//!
//! Currently the following data can be accessed:
//!
//! - Temperature (°C)
//! - Illuminance (lx)
//! - Soil moisture (%)
//! - Soil conductivity (µS/cm)
//! - Battery level (%)
//! - Firmware version
//!
//! The Bluetooth stack is abstracted by the traits in [`ble`]. With the
//! default `bluest` feature, `BluestAdapter` drives the host's real adapter.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "bluest")]
//! # #[tokio::main]
//! # pub async fn main() -> Result<(), miflora::Error> {
//!     let adapter = miflora::BluestAdapter::default_adapter().await?;
//!     let sensor = miflora::PlantSensor::new(adapter, "C4:7C:8D:6A:3E:01");
//!     let data = sensor.get_data().await?;
//!     println!("{data}");
//!     let properties = sensor.get_properties().await?;
//!     println!("{properties}");
//! #   Ok(())
//! # }
//! # #[cfg(not(feature = "bluest"))]
//! # fn main() {}
//! ```

pub mod ble;
#[cfg(feature = "bluest")]
mod bluest_backend;
pub mod config;
pub mod error;
pub mod locator;
pub mod message;
pub mod mock;
mod plant_sensor;
pub mod poll;
mod sensor_reading;
pub mod session;

#[cfg(feature = "bluest")]
pub use bluest_backend::{BluestAdapter, BluestDevice};
pub use config::PollConfig;
pub use error::{DecodeError, Error, FailureCategory, Result, Stage};
pub use plant_sensor::PlantSensor;
pub use sensor_reading::{SensorData, SensorProperties};
