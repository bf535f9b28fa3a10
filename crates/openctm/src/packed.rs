//! Packed integer and float array codec.
//!
//! CTM stores arrays of 32-bit words in a byte-plane interleaved layout
//! before entropy coding: for each byte position of the word (most
//! significant plane first), the byte values of all words are stored
//! contiguously, tuple-major within a plane. Similar components end up
//! adjacent, which is what makes the entropy coder effective on them.
//!
//! Signed arrays additionally fold the sign into the low bit so small
//! magnitudes of either sign stay small:
//! `stored = if v < 0 { -1 - 2v } else { 2v }`.

use crate::entropy::{self, CompressionLevel, PROPERTIES_LEN};
use crate::error::FormatError;
use crate::io::{Reader, Writer};

/// Scatter one 32-bit word into the interleaved byte planes.
///
/// `offset` is the word's position within a plane, `stride` the plane
/// size (`count * size`). The most significant byte lands in plane 0.
fn interleaved_insert(value: i32, data: &mut [u8], offset: usize, stride: usize) {
    let v = value as u32;
    data[offset + 3 * stride] = (v & 0xFF) as u8;
    data[offset + 2 * stride] = ((v >> 8) & 0xFF) as u8;
    data[offset + stride] = ((v >> 16) & 0xFF) as u8;
    data[offset] = ((v >> 24) & 0xFF) as u8;
}

/// Gather one 32-bit word back out of the interleaved byte planes.
fn interleaved_retrieve(data: &[u8], offset: usize, stride: usize) -> i32 {
    let b0 = u32::from(data[offset + 3 * stride]);
    let b1 = u32::from(data[offset + 2 * stride]);
    let b2 = u32::from(data[offset + stride]);
    let b3 = u32::from(data[offset]);
    (b0 | (b1 << 8) | (b2 << 16) | (b3 << 24)) as i32
}

/// Fold the sign into the low bit.
fn to_signed_magnitude(v: i32) -> i32 {
    if v < 0 {
        (-1i32).wrapping_sub(v.wrapping_shl(1))
    } else {
        v.wrapping_shl(1)
    }
}

/// Inverse of [`to_signed_magnitude`].
///
/// Widens to 64 bits so the +1 in the odd branch cannot wrap for the
/// extreme raw value 0xFFFF_FFFF (which maps back to `i32::MIN`).
fn from_signed_magnitude(raw: i32) -> i32 {
    let x = u64::from(raw as u32);
    if x & 1 != 0 {
        -(((x + 1) >> 1) as i64) as i32
    } else {
        (x >> 1) as i32
    }
}

/// Check a declared element count against the data actually provided.
fn check_len(data_len: usize, count: usize, size: usize) -> Result<(), FormatError> {
    let needed = count * size;
    if data_len < needed {
        return Err(FormatError::LengthMismatch {
            needed,
            provided: data_len,
        });
    }
    Ok(())
}

/// Interleave, compress, and frame a block of 32-bit words.
fn write_packed_words(
    w: &mut Writer,
    words: impl Iterator<Item = i32>,
    count: usize,
    size: usize,
    level: CompressionLevel,
) -> Result<(), FormatError> {
    let stride = count * size;
    let mut planes = vec![0u8; stride * 4];
    for (idx, word) in words.enumerate() {
        let (i, k) = (idx / size, idx % size);
        interleaved_insert(word, &mut planes, i + k * count, stride);
    }

    let (properties, stream) = entropy::compress(&planes, level)?;
    w.write_u32(stream.len() as u32);
    w.write_bytes(&properties);
    w.write_bytes(&stream);
    Ok(())
}

/// Read a framed compressed block and de-interleave it into words.
fn read_packed_words(
    r: &mut Reader<'_>,
    count: usize,
    size: usize,
) -> Result<Vec<i32>, FormatError> {
    let compressed_len = r.read_u32("compressed size")? as usize;
    let properties = r.read_bytes(PROPERTIES_LEN, "coder properties")?;
    let stream = r.read_bytes(compressed_len, "compressed data")?;

    let stride = count * size;
    let planes = entropy::decompress(properties, stream, stride * 4)?;

    let mut words = Vec::with_capacity(stride);
    for i in 0..count {
        for k in 0..size {
            words.push(interleaved_retrieve(&planes, i + k * count, stride));
        }
    }
    Ok(words)
}

/// Write `count` tuples of `size` integers as a packed block.
///
/// Fails with a length mismatch when `data` holds fewer than
/// `count * size` values; the declared counts are never trusted over
/// the data.
pub(crate) fn write_packed_ints(
    w: &mut Writer,
    data: &[i32],
    count: usize,
    size: usize,
    signed: bool,
    level: CompressionLevel,
) -> Result<(), FormatError> {
    check_len(data.len(), count, size)?;
    let words = data[..count * size].iter().map(|&v| {
        if signed {
            to_signed_magnitude(v)
        } else {
            v
        }
    });
    write_packed_words(w, words, count, size, level)
}

/// Read `count` tuples of `size` integers from a packed block.
pub(crate) fn read_packed_ints(
    r: &mut Reader<'_>,
    count: usize,
    size: usize,
    signed: bool,
) -> Result<Vec<i32>, FormatError> {
    let mut words = read_packed_words(r, count, size)?;
    if signed {
        for v in &mut words {
            *v = from_signed_magnitude(*v);
        }
    }
    Ok(words)
}

/// Write `count` tuples of `size` floats as a packed block.
///
/// Floats move as raw bit patterns.
pub(crate) fn write_packed_floats(
    w: &mut Writer,
    data: &[f32],
    count: usize,
    size: usize,
    level: CompressionLevel,
) -> Result<(), FormatError> {
    check_len(data.len(), count, size)?;
    let words = data[..count * size].iter().map(|&v| v.to_bits() as i32);
    write_packed_words(w, words, count, size, level)
}

/// Read `count` tuples of `size` floats from a packed block.
pub(crate) fn read_packed_floats(
    r: &mut Reader<'_>,
    count: usize,
    size: usize,
) -> Result<Vec<f32>, FormatError> {
    let words = read_packed_words(r, count, size)?;
    Ok(words.into_iter().map(|v| f32::from_bits(v as u32)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn round_trip_ints(data: &[i32], count: usize, size: usize, signed: bool) -> Vec<i32> {
        let mut w = Writer::new();
        write_packed_ints(&mut w, data, count, size, signed, CompressionLevel::DEFAULT).unwrap();
        let bytes = w.into_inner();
        let mut r = Reader::new(&bytes);
        let out = read_packed_ints(&mut r, count, size, signed).unwrap();
        assert_eq!(r.remaining(), 0);
        out
    }

    #[test]
    fn test_signed_magnitude_edge_values() {
        for v in [0, 1, -1, 2, -2, i32::MAX, i32::MIN] {
            assert_eq!(from_signed_magnitude(to_signed_magnitude(v)), v, "v={v}");
        }
        // Small magnitudes of either sign map to small stored values.
        assert_eq!(to_signed_magnitude(0), 0);
        assert_eq!(to_signed_magnitude(-1), 1);
        assert_eq!(to_signed_magnitude(1), 2);
        assert_eq!(to_signed_magnitude(-2), 3);
    }

    #[test]
    fn test_interleave_layout() {
        // One tuple of one word: planes are single bytes, MSB first.
        let mut planes = vec![0u8; 4];
        interleaved_insert(0x0102_0304, &mut planes, 0, 1);
        assert_eq!(planes, vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(interleaved_retrieve(&planes, 0, 1), 0x0102_0304);
    }

    #[test]
    fn test_unsigned_passes_negative_bits_through() {
        // Unsigned packing carries two's complement patterns untouched,
        // which the vertex delta codec relies on for negative X deltas.
        let data = [-5, 17, -1, 0, 123, -99];
        assert_eq!(round_trip_ints(&data, 2, 3, false), data);
    }

    #[test]
    fn test_signed_round_trip() {
        let data = [-5, 17, -1, 0, 123, -99, i32::MIN, i32::MAX];
        assert_eq!(round_trip_ints(&data, 4, 2, true), data);
    }

    #[test]
    fn test_float_round_trip() {
        let data = [0.0f32, -1.5, 1e-20, f32::INFINITY, 1234.5678];
        let mut w = Writer::new();
        write_packed_floats(&mut w, &data, 5, 1, CompressionLevel::DEFAULT).unwrap();
        let bytes = w.into_inner();
        let mut r = Reader::new(&bytes);
        let out = read_packed_floats(&mut r, 5, 1).unwrap();
        for (a, b) in data.iter().zip(&out) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_short_data_is_an_error() {
        let mut w = Writer::new();
        let err =
            write_packed_ints(&mut w, &[1, 2, 3], 2, 3, false, CompressionLevel::DEFAULT)
                .unwrap_err();
        assert_eq!(
            err,
            FormatError::LengthMismatch {
                needed: 6,
                provided: 3
            }
        );
    }

    proptest! {
        #[test]
        fn prop_signed_magnitude_round_trips(v in any::<i32>()) {
            prop_assert_eq!(from_signed_magnitude(to_signed_magnitude(v)), v);
        }

        #[test]
        fn prop_packed_ints_round_trip(
            data in proptest::collection::vec(any::<i32>(), 0..64),
            signed in any::<bool>(),
        ) {
            let count = data.len();
            let out = round_trip_ints(&data, count, 1, signed);
            prop_assert_eq!(out, data);
        }
    }
}
