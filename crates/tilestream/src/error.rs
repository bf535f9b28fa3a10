//! Error types for the tilestream crate.

use std::fmt;

/// Result type for tilestream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching, parsing, or staging tiles.
///
/// Staging errors are recovered at tile granularity: a failed tile
/// reverts to its unstaged state and is retried on a later eligible
/// traversal. Nothing here ever crosses the tile boundary into the
/// scheduler's frame loop.
#[derive(Debug)]
pub enum Error {
    /// Fetching a resource failed (missing file, transport failure).
    Resource {
        /// The path that failed to load.
        path: String,
        /// The error message.
        message: String,
    },
    /// The tile container envelope is malformed.
    Container {
        /// Where in the envelope the error occurred.
        context: &'static str,
        /// Description of what was wrong.
        detail: String,
    },
    /// The JSON tile manifest failed to parse.
    Manifest(serde_json::Error),
    /// A CTM geometry buffer failed to decode.
    Decode(openctm::Error),
    /// A texture buffer failed to decode.
    Texture {
        /// The error message from the image decoder.
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Resource { path, message } => {
                write!(f, "failed to load {path}: {message}")
            }
            Error::Container { context, detail } => {
                write!(f, "malformed tile container {context}: {detail}")
            }
            Error::Manifest(e) => write!(f, "failed to parse tile manifest: {e}"),
            Error::Decode(e) => write!(f, "failed to decode mesh: {e}"),
            Error::Texture { message } => write!(f, "failed to decode texture: {message}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Manifest(e) => Some(e),
            Error::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Manifest(e)
    }
}

impl From<openctm::Error> for Error {
    fn from(e: openctm::Error) -> Self {
        Error::Decode(e)
    }
}
