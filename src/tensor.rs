//! Q8.8 fixed-point tensor codec.
//!
//! Converts between host floating-point arrays and the 16-bit little-endian Q8.8 byte stream the
//! device expects. Rounding is truncation toward zero after multiplying by 256 — not
//! round-to-nearest — and out-of-range values wrap rather than saturate. Both are load-bearing:
//! Q8.8 is the device's native numeric type and this driver must be bit-for-bit compatible with
//! it.

/// A host real type that can be converted to and from Q8.8.
///
/// Implemented for `f32` and `f64` below; this is the generic seam that stands in for the
/// source's macro-generated float/double copies of the tensor codec.
pub trait Real: Copy {
    fn to_q8_8(self) -> i16;
    fn from_q8_8(q: i16) -> Self;
}

impl Real for f32 {
    fn to_q8_8(self) -> i16 {
        // `as i16` directly would saturate on overflow (Rust's float-to-int casts saturate, not
        // wrap); going through i32 first then truncating preserves the wraparound this format
        // requires.
        (self * 256.0) as i32 as i16
    }

    fn from_q8_8(q: i16) -> Self {
        q as f32 / 256.0
    }
}

impl Real for f64 {
    fn to_q8_8(self) -> i16 {
        (self * 256.0) as i32 as i16
    }

    fn from_q8_8(q: i16) -> Self {
        q as f64 / 256.0
    }
}

/// Encode `values` as a little-endian Q8.8 byte stream of length `2 * values.len()`.
pub fn encode<T: Real>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 2);
    for &v in values {
        out.extend_from_slice(&v.to_q8_8().to_le_bytes());
    }
    out
}

/// Decode a little-endian Q8.8 byte stream into `out`, one value per two bytes of `bytes`.
///
/// Panics if `bytes.len() != 2 * out.len()`, mirroring the fixed-size tensor contract of
/// `recv_tensor_*`.
pub fn decode<T: Real>(bytes: &[u8], out: &mut [T]) {
    assert_eq!(bytes.len(), out.len() * 2, "byte/tensor length mismatch");

    for (chunk, slot) in bytes.chunks_exact(2).zip(out.iter_mut()) {
        let q = i16::from_le_bytes([chunk[0], chunk[1]]);
        *slot = T::from_q8_8(q);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_values() {
        // 1.0, -1.0, 0.5 in Q8.8 little-endian
        let bytes = encode(&[1.0f32, -1.0, 0.5]);
        assert_eq!(bytes, vec![0x00, 0x01, 0x00, 0xFF, 0x80, 0x00]);
    }

    #[test]
    fn round_trips_representable_values() {
        let values: Vec<f32> = vec![0.0, 1.0, -1.0, 0.5, -0.5, 42.25, -42.25, 127.5, -128.0];
        let bytes = encode(&values);
        let mut out = vec![0.0f32; values.len()];
        decode(&bytes, &mut out);

        for (v, r) in values.iter().zip(out.iter()) {
            let expected = ((*v * 256.0) as i16) as f32 / 256.0;
            assert_eq!(*r, expected);
        }
    }

    #[test]
    fn truncates_toward_zero_not_nearest() {
        // 1.999... * 256 = 511.87..., truncated = 511, not rounded to 512
        let bytes = encode(&[1.998f32]);
        let q = i16::from_le_bytes([bytes[0], bytes[1]]);
        assert_eq!(q, 511);

        let bytes = encode(&[-1.998f32]);
        let q = i16::from_le_bytes([bytes[0], bytes[1]]);
        assert_eq!(q, -511);
    }

    #[test]
    fn f64_path_matches_f32_path() {
        let values = [3.125f64, -7.5];
        let bytes = encode(&values);
        let mut out = [0.0f64; 2];
        decode(&bytes, &mut out);
        assert_eq!(out, [3.125, -7.5]);
    }

    #[test]
    fn byte_tensor_is_passthrough() {
        // Byte-tensor sends bypass this module entirely (see Driver::send_bytes); this test just
        // documents that a Q8.8 round trip of integral byte-sized values is the identity when
        // values sit inside the representable range, which the wire format relies on nowhere but
        // is a useful sanity check of the codec's low end.
        let values: Vec<f32> = (0..=255).map(|b| b as f32).collect();
        let bytes = encode(&values);
        // Values >= 128 wrap once multiplied by 256 and truncated to i16, which is intentional:
        // Q8.8 has an 8-bit integer part, so this sweep is only meaningful below 128.
        let mut out = vec![0.0f32; values.len()];
        decode(&bytes, &mut out);
        for v in 0..128 {
            assert_eq!(out[v], v as f32);
        }
    }
}
