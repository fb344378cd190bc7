use uuid::Uuid;

use crate::error::DecodeError;
use crate::sensor_reading::SensorData;

/// Characteristic that switches the sensor's operating mode
pub const MODE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x00001a00_0000_1000_8000_00805f9b34fb);

/// Characteristic holding the latest sensor data once live mode is on
pub const DATA_CHARACTERISTIC: Uuid = Uuid::from_u128(0x00001a01_0000_1000_8000_00805f9b34fb);

/// A verbatim command written to the mode characteristic which asks for a live reading
pub const REQUEST_LIVE_DATA: [u8; 2] = [0xa0, 0x1f];

const MIN_LEN: usize = 10;

/// Decode the sensor data payload.
///
/// The payload format is (little-endian):
///
/// Start Byte | End Byte | Meaning
/// 0          | 1        | Temperature in °C/10, signed
/// 2          | 2        | Unused
/// 3          | 6        | Illuminance in lx
/// 7          | 7        | Moisture in %
/// 8          | 9        | Conductivity in µS/cm
///
/// Anything after byte 9 is ignored.
pub fn decode_sensor_data(data: &[u8]) -> Result<SensorData, DecodeError> {
    if data.len() < MIN_LEN {
        return Err(DecodeError::TooShort {
            kind: "sensor data",
            expected: MIN_LEN,
            actual: data.len(),
        });
    }

    let temperature = i16::from_le_bytes([data[0], data[1]]);
    let illuminance = u32::from_le_bytes([data[3], data[4], data[5], data[6]]);
    let conductivity = u16::from_le_bytes([data[8], data[9]]);

    Ok(SensorData {
        temperature: f32::from(temperature) / 10.0,
        illuminance,
        moisture: data[7],
        conductivity,
    })
}

#[test]
fn test_decode_sensor_data_happy() {
    let data = hex::decode("d100006d020000324e01").unwrap();
    let result = decode_sensor_data(&data).unwrap();
    assert_eq!(
        result,
        SensorData {
            temperature: 20.9,
            illuminance: 621,
            moisture: 50,
            conductivity: 334,
        }
    );
}

#[test]
fn test_decode_sensor_data_negative_temperature() {
    // -5.3 °C, bright sun, dry soil
    let data = hex::decode("cbff00a086010000000000").unwrap();
    let result = decode_sensor_data(&data).unwrap();
    assert_eq!(result.temperature, -5.3);
    assert_eq!(result.illuminance, 100_000);
    assert_eq!(result.moisture, 0);
    assert_eq!(result.conductivity, 0);
}

#[test]
fn test_decode_sensor_data_ignores_reserved_and_trailing_bytes() {
    let data = hex::decode("d1007f6d020000324e01023c00fb349b").unwrap();
    let reference = hex::decode("d100006d020000324e01").unwrap();
    assert_eq!(decode_sensor_data(&data), decode_sensor_data(&reference));
}

#[test]
fn test_decode_sensor_data_too_short() {
    let data = hex::decode("d100006d020000324e").unwrap();
    assert_eq!(
        decode_sensor_data(&data),
        Err(DecodeError::TooShort {
            kind: "sensor data",
            expected: 10,
            actual: 9
        })
    );
    assert!(decode_sensor_data(&[]).is_err());
}

#[test]
fn test_decode_sensor_data_is_deterministic() {
    let data = [0x12, 0x01, 0x7f, 0xff, 0xff, 0xff, 0xff, 0x64, 0xff, 0xff];
    let first = decode_sensor_data(&data).unwrap();
    for _ in 0..10 {
        assert_eq!(decode_sensor_data(&data).unwrap(), first);
    }
    assert_eq!(first.illuminance, u32::MAX);
    assert_eq!(first.conductivity, u16::MAX);
}
