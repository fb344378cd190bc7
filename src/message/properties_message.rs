use uuid::Uuid;

use crate::error::DecodeError;
use crate::sensor_reading::SensorProperties;

/// Characteristic holding battery level and firmware version
pub const PROPERTIES_CHARACTERISTIC: Uuid = Uuid::from_u128(0x00001a02_0000_1000_8000_00805f9b34fb);

const MIN_LEN: usize = 2;

/// Decode the properties payload.
///
/// Byte 0 is the battery level in %, byte 1 is unused and the rest is the
/// firmware version as text. Invalid UTF-8 is replaced rather than rejected.
pub fn decode_properties(data: &[u8]) -> Result<SensorProperties, DecodeError> {
    if data.len() < MIN_LEN {
        return Err(DecodeError::TooShort {
            kind: "properties",
            expected: MIN_LEN,
            actual: data.len(),
        });
    }

    Ok(SensorProperties {
        battery_level: data[0],
        firmware_version: String::from_utf8_lossy(&data[2..]).into_owned(),
    })
}

#[test]
fn test_decode_properties_happy() {
    let data = [0x5a, 0x00, 0x31, 0x2e, 0x30, 0x2e, 0x30];
    let result = decode_properties(&data).unwrap();
    assert_eq!(result.battery_level, 90);
    assert_eq!(result.firmware_version, "1.0.0");
}

#[test]
fn test_decode_properties_without_firmware() {
    let result = decode_properties(&[0x64, 0x2b]).unwrap();
    assert_eq!(result.battery_level, 100);
    assert_eq!(result.firmware_version, "");
}

#[test]
fn test_decode_properties_too_short() {
    assert_eq!(
        decode_properties(&[0x5a]),
        Err(DecodeError::TooShort {
            kind: "properties",
            expected: 2,
            actual: 1
        })
    );
}

#[test]
fn test_decode_properties_invalid_utf8() {
    let result = decode_properties(&[0x10, 0x00, 0x33, 0xff, 0x2e]).unwrap();
    assert_eq!(result.firmware_version, "3\u{fffd}.");
}
