//! Unit tests for CSC Measurement parsing.

use bikestream::sensors::csc::{parse_csc_measurement, CrankData};
use bikestream::sensors::types::SensorError;

#[test]
fn test_parse_crank_only() {
    // Flags: 0x02 (crank data)
    // Revolutions: 0x01F4 = 500
    // Event time: 0x0400 = 1024 ticks
    let data = [0x02, 0xF4, 0x01, 0x00, 0x04];
    let result = parse_csc_measurement(&data).unwrap();

    assert!(!result.has_wheel_data);
    assert_eq!(
        result.crank,
        Some(CrankData {
            revolutions: 500,
            event_time: 1024
        })
    );
}

#[test]
fn test_parse_wheel_and_crank() {
    // Flags: 0x03 (wheel + crank)
    // Wheel: 6 bytes, skipped
    // Revolutions: 3, event time: 2048
    let data = [
        0x03, 0xAA, 0xBB, 0xCC, 0xDD, 0x10, 0x20, 0x03, 0x00, 0x00, 0x08,
    ];
    let result = parse_csc_measurement(&data).unwrap();

    assert!(result.has_wheel_data);
    assert_eq!(
        result.crank,
        Some(CrankData {
            revolutions: 3,
            event_time: 2048
        })
    );
}

#[test]
fn test_parse_wheel_only_has_no_crank() {
    let data = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    let result = parse_csc_measurement(&data).unwrap();

    assert!(result.has_wheel_data);
    assert!(!result.has_crank_data());
}

#[test]
fn test_parse_flags_only() {
    let result = parse_csc_measurement(&[0x00]).unwrap();
    assert!(!result.has_wheel_data);
    assert!(result.crank.is_none());
}

#[test]
fn test_parse_empty_is_malformed() {
    assert!(matches!(
        parse_csc_measurement(&[]),
        Err(SensorError::MalformedFrame {
            expected: 1,
            actual: 0
        })
    ));
}

#[test]
fn test_parse_truncated_crank_is_malformed() {
    assert!(matches!(
        parse_csc_measurement(&[0x02, 0x01, 0x00]),
        Err(SensorError::MalformedFrame {
            expected: 5,
            actual: 3
        })
    ));
}

#[test]
fn test_parse_truncated_after_wheel_is_malformed() {
    // Wheel data present pushes the crank fields to offset 7
    let data = [0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00];
    assert!(matches!(
        parse_csc_measurement(&data),
        Err(SensorError::MalformedFrame {
            expected: 11,
            actual: 9
        })
    ));
}

#[test]
fn test_parse_ignores_trailing_bytes() {
    let data = [0x02, 0x0A, 0x00, 0x00, 0x02, 0xFF, 0xFF];
    let result = parse_csc_measurement(&data).unwrap();
    assert_eq!(result.crank.map(|c| c.revolutions), Some(10));
}

#[test]
fn test_parse_is_pure() {
    let data = [0x02, 0xFF, 0xFF, 0xE8, 0xFD];
    assert_eq!(
        parse_csc_measurement(&data).unwrap(),
        parse_csc_measurement(&data).unwrap()
    );
}
