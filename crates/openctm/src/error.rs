//! Error types for CTM encoding and decoding.

use std::fmt;

use crate::io::Tag;

/// Result type for CTM operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding or decoding a CTM file.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The byte stream itself is malformed.
    Format(FormatError),
    /// The stream decoded cleanly but the resulting mesh is invalid.
    Integrity(IntegrityError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(e) => write!(f, "format error: {e}"),
            Error::Integrity(e) => write!(f, "integrity error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Format(e) => Some(e),
            Error::Integrity(e) => Some(e),
        }
    }
}

impl From<FormatError> for Error {
    fn from(e: FormatError) -> Self {
        Error::Format(e)
    }
}

impl From<IntegrityError> for Error {
    fn from(e: IntegrityError) -> Self {
        Error::Integrity(e)
    }
}

/// A malformed or unexpected byte stream.
///
/// Format errors are always fatal to the single decode that raised them
/// and are never retried internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The file does not start with the `OCTM` magic tag.
    BadMagic {
        /// The four bytes found in place of the magic.
        found: Tag,
    },
    /// A section tag did not match the expected one.
    TagMismatch {
        /// The tag the decoder expected to read.
        expected: Tag,
        /// The tag actually present in the stream.
        found: Tag,
    },
    /// No decoder matches the (method tag, version) pair.
    UnsupportedFormat {
        /// The method tag read from the header.
        tag: Tag,
        /// The format version read from the header.
        version: u32,
    },
    /// The stream ended in the middle of a value.
    UnexpectedEof {
        /// What was being read when the stream ran out.
        context: &'static str,
    },
    /// A declared length does not match the data actually provided.
    LengthMismatch {
        /// Number of elements the declared counts require.
        needed: usize,
        /// Number of elements actually present.
        provided: usize,
    },
    /// Any other malformed content.
    Invalid {
        /// What was being decoded.
        context: &'static str,
        /// Description of what was wrong.
        detail: String,
    },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::BadMagic { found } => {
                write!(f, "file does not start with the OCTM tag (found \"{found}\")")
            }
            FormatError::TagMismatch { expected, found } => {
                write!(
                    f,
                    "expected data tag \"{expected}\" but read \"{found}\""
                )
            }
            FormatError::UnsupportedFormat { tag, version } => {
                write!(
                    f,
                    "no decoder for compression method \"{tag}\" version {version}"
                )
            }
            FormatError::UnexpectedEof { context } => {
                write!(f, "unexpected end of stream while reading {context}")
            }
            FormatError::LengthMismatch { needed, provided } => {
                write!(
                    f,
                    "data is smaller than stated by other parameters: needed {needed}, provided {provided}"
                )
            }
            FormatError::Invalid { context, detail } => {
                write!(f, "invalid {context}: {detail}")
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// A fully-decoded mesh that violates its invariants.
///
/// Raised only after all arrays have been constructed, so a caller
/// holding the error also has a complete (if rejected) mesh to inspect.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityError {
    /// The vertex array is empty or there are no triangles.
    Empty,
    /// The index array length is not a multiple of three.
    IndexCount {
        /// The offending index array length.
        len: usize,
    },
    /// An index points past the end of the vertex array.
    IndexOutOfRange {
        /// The offending index value.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },
    /// A vertex, normal, UV, or attribute value is NaN or infinite.
    NotFinite {
        /// Which array held the non-finite value.
        context: &'static str,
    },
    /// An attribute map has a precision of zero or below.
    BadPrecision {
        /// The offending precision value.
        value: f32,
    },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityError::Empty => {
                write!(f, "the vertex or index array is empty")
            }
            IntegrityError::IndexCount { len } => {
                write!(f, "the index array size {len} is not a multiple of three")
            }
            IntegrityError::IndexOutOfRange {
                index,
                vertex_count,
            } => {
                write!(
                    f,
                    "index {index} points to a nonexistent vertex (vertex count {vertex_count})"
                )
            }
            IntegrityError::NotFinite { context } => {
                write!(f, "one of the {context} values is not finite")
            }
            IntegrityError::BadPrecision { value } => {
                write!(f, "a precision value of {value} <= 0.0 was read")
            }
        }
    }
}

impl std::error::Error for IntegrityError {}
