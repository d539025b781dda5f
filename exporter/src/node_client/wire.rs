//! Packet framing and payload layouts of the Qubic peer protocol.
//!
//! Every packet starts with an 8-byte header:
//!
//! ```text
//! +----------------+------+----------------+
//! | size (3 B, LE) | type | dejavu (4 B)   |
//! +----------------+------+----------------+
//! ```
//!
//! `size` counts the header itself. All integers are little-endian.

use thiserror::Error;

/// Length of the packet header in bytes.
pub const HEADER_LEN: usize = 8;

/// Largest packet we are willing to buffer.
pub const MAX_PACKET_SIZE: usize = 1 << 20;

pub const EXCHANGE_PUBLIC_PEERS: u8 = 0;
pub const REQUEST_CURRENT_TICK_INFO: u8 = 27;
pub const RESPOND_CURRENT_TICK_INFO: u8 = 28;
pub const REQUEST_SYSTEM_INFO: u8 = 46;
pub const RESPOND_SYSTEM_INFO: u8 = 47;

/// Errors decoding packets received from a node.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("packet size {0} is smaller than the 8-byte header")]
    SizeTooSmall(usize),
    #[error("packet size {0} exceeds the 1 MiB limit")]
    SizeTooLarge(usize),
    #[error("{message} payload is {actual} bytes, expected at least {expected}")]
    ShortPayload {
        message: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Decoded packet header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PacketHeader {
    /// Total packet size, header included.
    pub size: usize,
    /// Message type.
    pub kind: u8,
    /// Request nonce; responses echo the nonce of the request.
    pub dejavu: u32,
}

impl PacketHeader {
    /// Header of a payload-less request.
    pub fn request(kind: u8, dejavu: u32) -> Self {
        Self {
            size: HEADER_LEN,
            kind,
            dejavu,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let size = (self.size as u32).to_le_bytes();
        let dejavu = self.dejavu.to_le_bytes();
        [
            size[0], size[1], size[2], self.kind, dejavu[0], dejavu[1], dejavu[2], dejavu[3],
        ]
    }

    /// Decodes and bounds-checks a header.
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Result<Self, WireError> {
        let size = u32::from_le_bytes([buf[0], buf[1], buf[2], 0]) as usize;
        if size < HEADER_LEN {
            return Err(WireError::SizeTooSmall(size));
        }
        if size > MAX_PACKET_SIZE {
            return Err(WireError::SizeTooLarge(size));
        }

        Ok(Self {
            size,
            kind: buf[3],
            dejavu: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Number of payload bytes following the header.
    pub fn payload_len(&self) -> usize {
        self.size - HEADER_LEN
    }
}

/// Payload of `RESPOND_CURRENT_TICK_INFO`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TickInfo {
    pub tick_duration: u16,
    pub epoch: u16,
    pub tick: u32,
    pub aligned_votes: u16,
    pub misaligned_votes: u16,
    pub initial_tick: u32,
}

impl TickInfo {
    pub const LEN: usize = 16;

    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        ensure_len("tick info", payload, Self::LEN)?;
        Ok(Self {
            tick_duration: le_u16(payload, 0),
            epoch: le_u16(payload, 2),
            tick: le_u32(payload, 4),
            aligned_votes: le_u16(payload, 8),
            misaligned_votes: le_u16(payload, 10),
            initial_tick: le_u32(payload, 12),
        })
    }
}

/// Leading fields of `RESPOND_SYSTEM_INFO`.
///
/// The full message also carries entity counts, the mining seed and
/// reserved fields, none of which are exported.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SystemInfo {
    pub version: i16,
    pub epoch: u16,
    pub tick: u32,
    pub initial_tick: u32,
}

impl SystemInfo {
    /// Minimum payload length needed to decode the fields above.
    pub const MIN_LEN: usize = 12;

    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        ensure_len("system info", payload, Self::MIN_LEN)?;
        Ok(Self {
            version: le_u16(payload, 0) as i16,
            epoch: le_u16(payload, 2),
            tick: le_u32(payload, 4),
            initial_tick: le_u32(payload, 8),
        })
    }
}

fn ensure_len(message: &'static str, payload: &[u8], expected: usize) -> Result<(), WireError> {
    if payload.len() < expected {
        return Err(WireError::ShortPayload {
            message,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_header_layout() {
        let bytes = PacketHeader::request(REQUEST_CURRENT_TICK_INFO, 0x0403_0201).encode();
        assert_eq!(bytes, [8, 0, 0, 27, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn header_decodes_three_byte_size() {
        let header = PacketHeader::decode(&[0x18, 0x01, 0x00, 47, 9, 0, 0, 0]).unwrap();
        assert_eq!(header.size, 0x118);
        assert_eq!(header.kind, RESPOND_SYSTEM_INFO);
        assert_eq!(header.dejavu, 9);
        assert_eq!(header.payload_len(), 0x110);
    }

    #[test]
    fn header_rejects_out_of_range_sizes() {
        assert_eq!(
            PacketHeader::decode(&[4, 0, 0, 28, 0, 0, 0, 0]),
            Err(WireError::SizeTooSmall(4))
        );
        assert_eq!(
            PacketHeader::decode(&[0xff, 0xff, 0xff, 28, 0, 0, 0, 0]),
            Err(WireError::SizeTooLarge(0x00ff_ffff))
        );
    }

    #[test]
    fn tick_info_decodes_little_endian_fields() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1000u16.to_le_bytes());
        payload.extend_from_slice(&5u16.to_le_bytes());
        payload.extend_from_slice(&100u32.to_le_bytes());
        payload.extend_from_slice(&451u16.to_le_bytes());
        payload.extend_from_slice(&3u16.to_le_bytes());
        payload.extend_from_slice(&90u32.to_le_bytes());

        let info = TickInfo::decode(&payload).unwrap();
        assert_eq!(
            info,
            TickInfo {
                tick_duration: 1000,
                epoch: 5,
                tick: 100,
                aligned_votes: 451,
                misaligned_votes: 3,
                initial_tick: 90,
            }
        );
    }

    #[test]
    fn system_info_ignores_trailing_fields() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&212i16.to_le_bytes());
        payload.extend_from_slice(&5u16.to_le_bytes());
        payload.extend_from_slice(&100u32.to_le_bytes());
        payload.extend_from_slice(&90u32.to_le_bytes());
        payload.extend_from_slice(&[0xaa; 64]);

        let info = SystemInfo::decode(&payload).unwrap();
        assert_eq!(info.version, 212);
        assert_eq!(info.initial_tick, 90);
    }

    #[test]
    fn short_payloads_are_rejected() {
        let err = TickInfo::decode(&[0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            WireError::ShortPayload {
                message: "tick info",
                expected: 16,
                actual: 10,
            }
        );
        assert!(SystemInfo::decode(&[0u8; 11]).is_err());
    }
}
