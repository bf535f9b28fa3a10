//! The LZMA boundary.
//!
//! CTM frames each compressed block as a `u32` compressed size, the
//! coder's five self-describing properties bytes, and the raw stream.
//! This module owns that framing and treats the coder itself as opaque:
//! nothing else in the crate touches `lzma_rs`.

use crate::error::FormatError;

/// Length of the coder's self-describing properties header.
pub(crate) const PROPERTIES_LEN: usize = 5;

/// CTM compression level, 1 (fastest) to 9 (smallest).
///
/// The level is carried through the writer API for parity with other
/// encoders of the format; the backing coder picks its own dictionary
/// sizing, so differing levels still produce mutually readable streams
/// (the properties header is always emitted alongside the data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(pub u32);

impl CompressionLevel {
    /// The format's customary default level.
    pub const DEFAULT: Self = Self(5);
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Compress `data`, returning the properties header and the raw stream.
///
/// The caller writes the framing (`u32` stream length, properties,
/// stream) to the output.
pub(crate) fn compress(
    data: &[u8],
    _level: CompressionLevel,
) -> Result<(Vec<u8>, Vec<u8>), FormatError> {
    let mut packed = Vec::new();
    lzma_rs::lzma_compress(&mut &data[..], &mut packed).map_err(|e| FormatError::Invalid {
        context: "compressed block",
        detail: e.to_string(),
    })?;

    // The backend emits [properties: 5][unpacked size: u64][stream].
    // The unpacked size is redundant with the framing and is dropped.
    if packed.len() < PROPERTIES_LEN + 8 {
        return Err(FormatError::Invalid {
            context: "compressed block",
            detail: format!("coder produced a {}-byte stream", packed.len()),
        });
    }
    let properties = packed[..PROPERTIES_LEN].to_vec();
    let stream = packed[PROPERTIES_LEN + 8..].to_vec();
    Ok((properties, stream))
}

/// Decompress a stream framed by `compress`.
///
/// `expected_len` makes decompression non-ambiguous; an output of any
/// other length is an error.
pub(crate) fn decompress(
    properties: &[u8],
    stream: &[u8],
    expected_len: usize,
) -> Result<Vec<u8>, FormatError> {
    // Rebuild the backend's header from the framing.
    let mut framed = Vec::with_capacity(PROPERTIES_LEN + 8 + stream.len());
    framed.extend_from_slice(properties);
    framed.extend_from_slice(&(expected_len as u64).to_le_bytes());
    framed.extend_from_slice(stream);

    let mut out = Vec::with_capacity(expected_len);
    lzma_rs::lzma_decompress(&mut &framed[..], &mut out).map_err(|e| FormatError::Invalid {
        context: "compressed block",
        detail: e.to_string(),
    })?;

    if out.len() != expected_len {
        return Err(FormatError::LengthMismatch {
            needed: expected_len,
            provided: out.len(),
        });
    }
    Ok(out)
}
