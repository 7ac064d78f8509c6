//! CSC (Cycling Speed and Cadence) protocol implementation.
//!
//! Parses CSC Measurement (0x2A5B) notifications into crank counters.
//! Wheel data is recognised so the crank fields can be located, but it is
//! not decoded.

use crate::sensors::types::SensorError;
use uuid::Uuid;

/// Cycling Speed and Cadence Service UUID (0x1816)
pub const CSC_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1816_0000_1000_8000_0080_5f9b_34fb);

/// CSC Measurement Characteristic UUID (0x2A5B)
pub const CSC_MEASUREMENT_UUID: Uuid = Uuid::from_u128(0x0000_2a5b_0000_1000_8000_0080_5f9b_34fb);

/// Wheel revolution data present (bit 0)
const FLAG_WHEEL_DATA: u8 = 0x01;
/// Crank revolution data present (bit 1)
const FLAG_CRANK_DATA: u8 = 0x02;

/// Cumulative wheel revolutions (u32) + last wheel event time (u16).
const WHEEL_DATA_LEN: usize = 6;
/// Cumulative crank revolutions (u16) + last crank event time (u16).
const CRANK_DATA_LEN: usize = 4;

/// Raw crank counters reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrankData {
    /// Cumulative crank revolutions, wraps at 65536
    pub revolutions: u16,
    /// Last crank event time in 1/1024 s ticks, wraps at 65536
    pub event_time: u16,
}

/// Decoded CSC Measurement notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CscMeasurement {
    /// Wheel revolution data was present in the frame
    pub has_wheel_data: bool,
    /// Crank revolution data (if present)
    pub crank: Option<CrankData>,
}

impl CscMeasurement {
    /// Whether the frame carried crank revolution data.
    pub fn has_crank_data(&self) -> bool {
        self.crank.is_some()
    }
}

/// Parse CSC Measurement notification.
///
/// The data format is:
/// - Byte 0: Flags
/// - Bytes 1-6: Wheel revolution data (if flag bit 0 is set)
/// - Next 4 bytes: Crank revolutions + last crank event time (if flag bit 1 is set)
///
/// A frame without crank data is valid; the caller has nothing to do with it.
pub fn parse_csc_measurement(data: &[u8]) -> Result<CscMeasurement, SensorError> {
    let flags = *data.first().ok_or(SensorError::MalformedFrame {
        expected: 1,
        actual: 0,
    })?;

    let has_wheel_data = (flags & FLAG_WHEEL_DATA) != 0;
    let has_crank_data = (flags & FLAG_CRANK_DATA) != 0;

    let mut offset = 1usize;
    if has_wheel_data {
        offset += WHEEL_DATA_LEN;
    }

    let required = if has_crank_data {
        offset + CRANK_DATA_LEN
    } else {
        offset
    };
    if data.len() < required {
        return Err(SensorError::MalformedFrame {
            expected: required,
            actual: data.len(),
        });
    }

    let crank = has_crank_data.then(|| CrankData {
        revolutions: u16::from_le_bytes([data[offset], data[offset + 1]]),
        event_time: u16::from_le_bytes([data[offset + 2], data[offset + 3]]),
    });

    Ok(CscMeasurement {
        has_wheel_data,
        crank,
    })
}
