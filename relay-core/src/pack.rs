//! Bit-packing of n-bit (n∈[1,8]) values into a byte stream with a
//! self-describing shape header.
//!
//! Wire format: `nd:u8`, then `nd` big-endian `u16` dimensions, then the
//! packed payload: every value's `n` bits written MSB-first into a
//! continuous bitstream, so the payload is always exactly
//! `ceil(total_elements * n / 8)` bytes. A per-`n` dtype/shift table
//! (u8/u16/u32 groups) would only byte-align this way when the element
//! count is a multiple of the group size; a continuous bitstream is the
//! byte-exact generalisation that holds for any element count (see the
//! worked example at n=3, 7 elements → 3 bytes, not 4).

use crate::error::RelayError;

/// Maximum size along any one dimension, bounded by the header's `u16`
/// field width.
pub const MAX_DIM: usize = u16::MAX as usize;

/// Pack an array of `n`-bit values (each must already be `< 2^n`) of the
/// given shape into a length-prefixed, shape-tagged byte buffer.
///
/// `n` must be in `[1, 8]`; `shape`'s product must equal `values.len()`, and
/// every dimension must fit in a `u16`.
pub fn pack(values: &[u8], shape: &[usize], n: u8) -> Result<Vec<u8>, RelayError> {
    if !(1..=8).contains(&n) {
        return Err(RelayError::Configuration(format!(
            "bits_per_value must be in [1, 8], got {n}"
        )));
    }
    if shape.is_empty() || shape.len() > 255 {
        return Err(RelayError::Configuration(
            "shape must have between 1 and 255 dimensions".into(),
        ));
    }
    for &d in shape {
        if d == 0 || d > MAX_DIM {
            return Err(RelayError::Configuration(format!(
                "dimension {d} out of range (1..={MAX_DIM})"
            )));
        }
    }
    let total: usize = shape.iter().product();
    if total != values.len() {
        return Err(RelayError::ShapeMismatch {
            expected: (total, 0),
            actual: (values.len(), 0),
        });
    }

    let mut out = Vec::with_capacity(1 + shape.len() * 2 + packed_len(total, n));
    out.push(shape.len() as u8);
    for &d in shape {
        out.extend_from_slice(&(d as u16).to_be_bytes());
    }
    out.extend_from_slice(&pack_values(values, n));
    Ok(out)
}

/// Unpack a buffer produced by [`pack`] back into its flat value array and
/// the declared shape. Rejects any header that is truncated, declares a
/// zero dimension, or whose declared shape is inconsistent with the
/// payload length actually present.
///
/// The header carries shape only, not bit width (matching §4.3's layout
/// exactly) — `n` is supplied by the caller from session configuration, the
/// same way the Packer's session-level wrapper does.
pub fn unpack(buf: &[u8], n: u8) -> Result<(Vec<u8>, Vec<usize>), RelayError> {
    if !(1..=8).contains(&n) {
        return Err(RelayError::Configuration(format!(
            "bits_per_value must be in [1, 8], got {n}"
        )));
    }
    if buf.is_empty() {
        return Err(RelayError::Codec("packed buffer is empty".into()));
    }
    let nd = buf[0] as usize;
    if nd == 0 {
        return Err(RelayError::Codec("packed buffer declares zero dimensions".into()));
    }
    let header_len = 1 + nd * 2;
    if buf.len() < header_len {
        return Err(RelayError::Codec("packed buffer header truncated".into()));
    }

    let mut shape = Vec::with_capacity(nd);
    for i in 0..nd {
        let off = 1 + i * 2;
        let d = u16::from_be_bytes([buf[off], buf[off + 1]]) as usize;
        if d == 0 {
            return Err(RelayError::Codec(
                "packed buffer declares a zero-length dimension".into(),
            ));
        }
        shape.push(d);
    }
    let total: usize = shape.iter().product();

    let payload = &buf[header_len..];
    let expected_payload_len = packed_len(total, n);
    if payload.len() != expected_payload_len {
        return Err(RelayError::Codec(format!(
            "packed payload length {} inconsistent with declared shape {:?} at {n} bits/value (expected {expected_payload_len})",
            payload.len(),
            shape
        )));
    }

    let values = unpack_values(payload, n, total);
    Ok((values, shape))
}

fn packed_len(total: usize, n: u8) -> usize {
    (total * n as usize).div_ceil(8)
}

/// Write every value's `n` bits MSB-first into a continuous bitstream.
fn pack_values(values: &[u8], n: u8) -> Vec<u8> {
    let total_bits = values.len() * n as usize;
    let mut out = vec![0u8; total_bits.div_ceil(8)];
    let mut bit_pos = 0usize;
    for &v in values {
        for i in (0..n).rev() {
            if (v >> i) & 1 != 0 {
                let byte_idx = bit_pos / 8;
                let bit_in_byte = 7 - (bit_pos % 8);
                out[byte_idx] |= 1 << bit_in_byte;
            }
            bit_pos += 1;
        }
    }
    out
}

/// Reverse of [`pack_values`]: read `total` consecutive `n`-bit groups back
/// out of the bitstream, MSB-first.
fn unpack_values(payload: &[u8], n: u8, total: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(total);
    let mut bit_pos = 0usize;
    for _ in 0..total {
        let mut v = 0u8;
        for _ in 0..n {
            let byte_idx = bit_pos / 8;
            let bit_in_byte = 7 - (bit_pos % 8);
            let bit = (payload[byte_idx] >> bit_in_byte) & 1;
            v = (v << 1) | bit;
            bit_pos += 1;
        }
        out.push(v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packer_roundtrip_n3_shape7() {
        let values: Vec<u8> = vec![5, 2, 7, 0, 1, 6, 3];
        let packed = pack(&values, &[7], 3).unwrap();
        // header (1 + 2 bytes) + 3 payload bytes: ceil(7*3/8) = 3
        assert_eq!(packed.len(), 3 + 3);
        let (unpacked, shape) = unpack(&packed, 3).unwrap();
        assert_eq!(shape, vec![7]);
        assert_eq!(unpacked, values);
    }

    #[test]
    fn roundtrip_for_every_bit_width() {
        for n in 1u8..=8 {
            let max: u16 = if n == 8 { 255 } else { (1u16 << n) - 1 };
            let values: Vec<u8> = (0..37).map(|i| (i as u16 % (max + 1)) as u8).collect();
            let packed = pack(&values, &[values.len()], n).unwrap();
            let (unpacked, _) = unpack(&packed, n).unwrap();
            assert_eq!(unpacked, values, "roundtrip failed for n={n}");
        }
    }

    #[test]
    fn multi_dimensional_shape_header() {
        let values = vec![0u8; 20];
        let packed = pack(&values, &[4, 5], 2).unwrap();
        let (_, shape) = unpack(&packed, 2).unwrap();
        assert_eq!(shape, vec![4, 5]);
    }

    #[test]
    fn rejects_inconsistent_length() {
        // header declares 1000x1000 at 4 bits/value but payload is 100 bytes
        let mut buf = vec![2u8];
        buf.extend_from_slice(&1000u16.to_be_bytes());
        buf.extend_from_slice(&1000u16.to_be_bytes());
        buf.extend_from_slice(&vec![0u8; 100]);
        let err = unpack(&buf, 4).unwrap_err();
        assert!(matches!(err, RelayError::Codec(_)));
    }

    #[test]
    fn rejects_zero_dimension_header() {
        let mut buf = vec![1u8];
        buf.extend_from_slice(&0u16.to_be_bytes());
        assert!(unpack(&buf, 1).is_err());
    }

    #[test]
    fn rejects_truncated_header() {
        let buf = vec![2u8, 0, 1];
        assert!(unpack(&buf, 1).is_err());
    }

    #[test]
    fn rejects_empty_buffer() {
        assert!(unpack(&[], 1).is_err());
    }

    #[test]
    fn rejects_invalid_bit_width() {
        assert!(pack(&[0], &[1], 0).is_err());
        assert!(pack(&[0], &[1], 9).is_err());
    }
}
