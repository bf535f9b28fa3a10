//! Little-endian cursor primitives for the CTM byte stream.
//!
//! All multi-byte values are little-endian regardless of host byte
//! order, and floats travel as their raw bit patterns rather than being
//! value-converted.

use std::fmt;

use crate::error::FormatError;

/// A four-character section or method tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Construct a tag from its four ASCII bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

/// A forward-only reader over a byte slice.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Read exactly `len` bytes, advancing the cursor.
    pub fn read_bytes(
        &mut self,
        len: usize,
        context: &'static str,
    ) -> Result<&'a [u8], FormatError> {
        if self.remaining() < len {
            return Err(FormatError::UnexpectedEof { context });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self, context: &'static str) -> Result<u32, FormatError> {
        let b = self.read_bytes(4, context)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian i32.
    pub fn read_i32(&mut self, context: &'static str) -> Result<i32, FormatError> {
        Ok(self.read_u32(context)? as i32)
    }

    /// Read a little-endian f32 by reinterpreting its bit pattern.
    pub fn read_f32(&mut self, context: &'static str) -> Result<f32, FormatError> {
        Ok(f32::from_bits(self.read_u32(context)?))
    }

    /// Read `count` little-endian i32 values.
    pub fn read_i32_array(
        &mut self,
        count: usize,
        context: &'static str,
    ) -> Result<Vec<i32>, FormatError> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_i32(context)?);
        }
        Ok(out)
    }

    /// Read `count` little-endian f32 values.
    pub fn read_f32_array(
        &mut self,
        count: usize,
        context: &'static str,
    ) -> Result<Vec<f32>, FormatError> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_f32(context)?);
        }
        Ok(out)
    }

    /// Read a four-byte tag.
    pub fn read_tag(&mut self) -> Result<Tag, FormatError> {
        let b = self.read_bytes(4, "tag")?;
        Ok(Tag([b[0], b[1], b[2], b[3]]))
    }

    /// Read a tag and fail unless it matches `expected`.
    ///
    /// The error names both the expected and the found tag.
    pub fn expect_tag(&mut self, expected: Tag) -> Result<(), FormatError> {
        let found = self.read_tag()?;
        if found != expected {
            return Err(FormatError::TagMismatch { expected, found });
        }
        Ok(())
    }

    /// Read a u32-length-prefixed ASCII string.
    ///
    /// An empty string is encoded as length 0 with no bytes.
    pub fn read_string(&mut self) -> Result<String, FormatError> {
        let len = self.read_u32("string length")? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = self.read_bytes(len, "string")?;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }
}

/// A writer accumulating little-endian output in a byte buffer.
#[derive(Debug, Default)]
pub struct Writer {
    data: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the writer and return the accumulated bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a little-endian u32.
    pub fn write_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian i32.
    pub fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }

    /// Write a little-endian f32 as its raw bit pattern.
    pub fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    /// Write each value of an i32 slice in little-endian order.
    pub fn write_i32_array(&mut self, values: &[i32]) {
        for &v in values {
            self.write_i32(v);
        }
    }

    /// Write each value of an f32 slice as raw bit patterns.
    pub fn write_f32_array(&mut self, values: &[f32]) {
        for &v in values {
            self.write_f32(v);
        }
    }

    /// Write a four-byte tag.
    pub fn write_tag(&mut self, tag: Tag) {
        self.data.extend_from_slice(&tag.0);
    }

    /// Write a u32-length-prefixed ASCII string.
    pub fn write_string(&mut self, text: &str) {
        self.write_u32(text.len() as u32);
        for c in text.chars() {
            self.data.push(c as u8);
        }
    }
}
