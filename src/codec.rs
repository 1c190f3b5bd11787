//! Wire codec for the charger's telemetry frames and register writes
//!
//! Inbound frames carry a function code at byte 7 followed by up to seven
//! big-endian `u32` fields. Outbound writes are a bare 6-byte
//! `[register:u16][value:u32]`, without any Modbus application header.

use crate::error::DecodeError;
use crate::telemetry::TelemetryRecord;

/// Function code of a "read holding registers" response
pub const READ_HOLDING_REGISTERS: u8 = 3;

/// Offset of the function code inside an inbound frame
pub const FUNCTION_CODE_OFFSET: usize = 7;

/// Offset of the first payload byte
pub const PAYLOAD_OFFSET: usize = 8;

/// Number of fields in a complete payload
pub const FIELD_COUNT: usize = 7;

/// Length of an encoded write
pub const WRITE_FRAME_LEN: usize = 6;

const VOLTAGE_DIVISOR: f64 = 10_000_000.0;
const CURRENT_DIVISOR: f64 = 10.0;
const POWER_DIVISOR: f64 = 10.0;

/// A register write waiting to be handed to the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingWrite {
    pub register: u16,
    pub value: u32,
}

impl PendingWrite {
    pub fn new(register: u16, value: u32) -> Self {
        Self { register, value }
    }

    /// Wire representation of this write
    pub fn encode(&self) -> [u8; WRITE_FRAME_LEN] {
        encode_write(self.register, self.value)
    }
}

/// Encode a register write: register big-endian, then value big-endian
pub fn encode_write(register: u16, value: u32) -> [u8; WRITE_FRAME_LEN] {
    let mut frame = [0u8; WRITE_FRAME_LEN];
    frame[..2].copy_from_slice(&register.to_be_bytes());
    frame[2..].copy_from_slice(&value.to_be_bytes());
    frame
}

/// Read a write frame back into its register and value
pub fn decode_write(frame: &[u8]) -> Option<PendingWrite> {
    if frame.len() != WRITE_FRAME_LEN {
        return None;
    }
    let register = u16::from_be_bytes([frame[0], frame[1]]);
    let value = u32::from_be_bytes([frame[2], frame[3], frame[4], frame[5]]);
    Some(PendingWrite { register, value })
}

/// Decode an inbound telemetry frame
///
/// A payload shorter than seven fields is not an error: every field that does
/// not fit reads as 0.
pub fn decode(frame: &[u8]) -> Result<TelemetryRecord, DecodeError> {
    if frame.len() < PAYLOAD_OFFSET {
        return Err(DecodeError::Truncated { len: frame.len() });
    }

    let code = frame[FUNCTION_CODE_OFFSET];
    if code != READ_HOLDING_REGISTERS {
        return Err(DecodeError::UnsupportedFunction { code });
    }

    let payload = &frame[PAYLOAD_OFFSET..];
    let mut raw = [0u32; FIELD_COUNT];
    for (index, slot) in raw.iter_mut().enumerate() {
        *slot = read_field(payload, index).unwrap_or(0);
    }

    let voltages = [
        scale(raw[0], VOLTAGE_DIVISOR),
        scale(raw[1], VOLTAGE_DIVISOR),
        scale(raw[2], VOLTAGE_DIVISOR),
    ];
    let currents = [
        scale(raw[3], CURRENT_DIVISOR),
        scale(raw[4], CURRENT_DIVISOR),
        scale(raw[5], CURRENT_DIVISOR),
    ];
    let total_power = scale(raw[6], POWER_DIVISOR);

    Ok(TelemetryRecord::new(voltages, currents, total_power))
}

/// Field `index` of the payload, if the payload is long enough to hold it
fn read_field(payload: &[u8], index: usize) -> Option<u32> {
    let start = index * 4;
    let bytes = payload.get(start..start + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn scale(raw: u32, divisor: f64) -> f64 {
    round2(f64::from(raw) / divisor)
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lowercase hex rendering for frame logging
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(code: u8, fields: &[u32]) -> Vec<u8> {
        let mut buf = vec![0u8; PAYLOAD_OFFSET];
        buf[FUNCTION_CODE_OFFSET] = code;
        for f in fields {
            buf.extend_from_slice(&f.to_be_bytes());
        }
        buf
    }

    #[test]
    fn test_encode_write() {
        assert_eq!(encode_write(8192, 150), [0x20, 0x00, 0x00, 0x00, 0x00, 0x96]);
        assert_eq!(encode_write(8198, 2), [0x20, 0x06, 0x00, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn test_decode_full_frame() {
        let buf = frame(3, &[2_301_000_000, 2_299_000_000, 0, 160, 158, 0, 73]);
        let rec = decode(&buf).unwrap();
        assert_eq!(rec.phase_voltage, [230.1, 229.9, 0.0]);
        assert_eq!(rec.phase_current, [16.0, 15.8, 0.0]);
        assert_eq!(rec.total_power, 7.3);
        assert_eq!(rec.combined_voltage, 230.0);
        assert_eq!(rec.combined_current, 31.8);
    }

    #[test]
    fn test_decode_rounds_to_two_decimals() {
        // 2_301_234_567 / 1e7 = 230.1234567
        let buf = frame(3, &[2_301_234_567, 0, 0, 1, 0, 0, 0]);
        let rec = decode(&buf).unwrap();
        assert_eq!(rec.phase_voltage[0], 230.12);
        assert_eq!(rec.phase_current[0], 0.1);
    }

    #[test]
    fn test_decode_short_buffers() {
        assert_eq!(decode(&[]), Err(DecodeError::Truncated { len: 0 }));
        assert_eq!(
            decode(&[0, 0, 0, 0, 0, 0, 3]),
            Err(DecodeError::Truncated { len: 7 })
        );
    }

    #[test]
    fn test_decode_other_function_code() {
        let buf = frame(6, &[1, 2, 3]);
        assert_eq!(
            decode(&buf),
            Err(DecodeError::UnsupportedFunction { code: 6 })
        );
    }

    #[test]
    fn test_decode_header_only() {
        let rec = decode(&frame(3, &[])).unwrap();
        assert_eq!(rec, TelemetryRecord::default());
    }

    #[test]
    fn test_decode_write() {
        assert_eq!(
            decode_write(&[0x20, 0x06, 0x00, 0x00, 0x00, 0x02]),
            Some(PendingWrite::new(8198, 2))
        );
        assert_eq!(decode_write(&[0x20, 0x06]), None);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x00, 0x03, 0xff]), "0003ff");
    }
}
