//! Wire-level encoding for the handshake's K byte and the frame message
//! metadata header. Kept separate from `transport` (generic framing) and
//! `encoder`/`decoder` (session state machines) since both sides of the
//! connection need identical encode/decode logic.

use crate::error::RelayError;

/// `frame_index(u32) | captured_ms(u64) | encoded_ms(u64) | cursor_x(u16) |
/// cursor_y(u16)`, matching the offsets in the frame message table.
pub const FRAME_HEADER_LEN: usize = 4 + 8 + 8 + 2 + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_index: u32,
    pub captured_ms: u64,
    pub encoded_ms: u64,
    pub cursor_x: u16,
    pub cursor_y: u16,
}

impl FrameHeader {
    /// Prefix `self` onto `payload`, producing the full frame message body
    /// (handed to `FrameTransport::send_framed`, which adds the outer
    /// length prefix).
    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        out.extend_from_slice(&self.frame_index.to_be_bytes());
        out.extend_from_slice(&self.captured_ms.to_be_bytes());
        out.extend_from_slice(&self.encoded_ms.to_be_bytes());
        out.extend_from_slice(&self.cursor_x.to_be_bytes());
        out.extend_from_slice(&self.cursor_y.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Split a received frame message into its header and compressed
    /// payload slice.
    pub fn decode(message: &[u8]) -> Result<(Self, &[u8]), RelayError> {
        if message.len() < FRAME_HEADER_LEN {
            return Err(RelayError::Codec(format!(
                "frame message of {} bytes is shorter than the {FRAME_HEADER_LEN}-byte header",
                message.len()
            )));
        }
        let frame_index = u32::from_be_bytes(message[0..4].try_into().unwrap());
        let captured_ms = u64::from_be_bytes(message[4..12].try_into().unwrap());
        let encoded_ms = u64::from_be_bytes(message[12..20].try_into().unwrap());
        let cursor_x = u16::from_be_bytes(message[20..22].try_into().unwrap());
        let cursor_y = u16::from_be_bytes(message[22..24].try_into().unwrap());
        Ok((
            Self { frame_index, captured_ms, encoded_ms, cursor_x, cursor_y },
            &message[FRAME_HEADER_LEN..],
        ))
    }
}

/// The handshake's K byte can't represent 256 directly in a `u8`. Since
/// `MIN_K` is 2, a wire value of 0 is otherwise unused — reserve it to mean
/// K=256 and encode every other K as itself.
pub fn encode_k(k: u16) -> u8 {
    if k == 256 { 0 } else { k as u8 }
}

pub fn decode_k(byte: u8) -> u16 {
    if byte == 0 { 256 } else { byte as u16 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = FrameHeader {
            frame_index: 7,
            captured_ms: 1_000,
            encoded_ms: 1_005,
            cursor_x: 329,
            cursor_y: 210,
        };
        let message = header.encode(&[1, 2, 3]);
        let (decoded, payload) = FrameHeader::decode(&message).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(payload, &[1, 2, 3]);
    }

    #[test]
    fn cursor_offsets_roundtrip() {
        let header = FrameHeader {
            frame_index: 0,
            captured_ms: 0,
            encoded_ms: 0,
            cursor_x: 329,
            cursor_y: 210,
        };
        let message = header.encode(&[]);
        assert_eq!(u16::from_be_bytes([message[20], message[21]]), 329);
        assert_eq!(u16::from_be_bytes([message[22], message[23]]), 210);
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(FrameHeader::decode(&[0u8; 10]).is_err());
    }

    #[test]
    fn k_byte_convention_round_trips() {
        for k in [2u16, 4, 100, 255, 256] {
            assert_eq!(decode_k(encode_k(k)), k);
        }
    }
}
