//! The 3MXB binary tile container.
//!
//! A container is a 5-byte magic `3MXBO`, a `u32` header length, a JSON
//! manifest of that length, and the declared resource buffers
//! concatenated in manifest order.

use crate::error::{Error, Result};
use crate::manifest::Manifest;

/// Container magic.
pub const MAGIC: &[u8; 5] = b"3MXBO";

/// A parsed tile container: the manifest plus one byte blob per
/// declared resource, in manifest order.
#[derive(Debug, Clone)]
pub struct TilePackage {
    /// The JSON header manifest.
    pub manifest: Manifest,
    /// Resource payloads, parallel to `manifest.resources`.
    pub blobs: Vec<Vec<u8>>,
}

impl TilePackage {
    /// Parse a container from its raw bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAGIC.len() + 4 {
            return Err(Error::Container {
                context: "envelope",
                detail: format!("{} bytes is too short for the fixed header", bytes.len()),
            });
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::Container {
                context: "magic",
                detail: format!(
                    "expected \"3MXBO\", found {:?}",
                    String::from_utf8_lossy(&bytes[..MAGIC.len()])
                ),
            });
        }

        let header_len = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) as usize;
        if header_len == 0 {
            return Err(Error::Container {
                context: "header",
                detail: "unexpected zero length header".to_string(),
            });
        }

        let header_start = MAGIC.len() + 4;
        let header_end = header_start + header_len;
        if bytes.len() < header_end {
            return Err(Error::Container {
                context: "header",
                detail: format!(
                    "declared header length {header_len} exceeds the {} available bytes",
                    bytes.len() - header_start
                ),
            });
        }

        let manifest: Manifest = serde_json::from_slice(&bytes[header_start..header_end])?;

        let mut blobs = Vec::with_capacity(manifest.resources.len());
        let mut offset = header_end;
        for resource in &manifest.resources {
            let end = offset + resource.size;
            if bytes.len() < end {
                return Err(Error::Container {
                    context: "resource",
                    detail: format!(
                        "resource \"{}\" declares {} bytes but only {} remain",
                        resource.id,
                        resource.size,
                        bytes.len() - offset
                    ),
                });
            }
            blobs.push(bytes[offset..end].to_vec());
            offset = end;
        }

        Ok(Self { manifest, blobs })
    }

    /// Serialize a container from a manifest and its resource payloads.
    ///
    /// Blob sizes in the manifest are rewritten from the actual payloads
    /// so the two cannot disagree.
    #[must_use]
    pub fn build(manifest: &Manifest, blobs: &[Vec<u8>]) -> Vec<u8> {
        let mut manifest = manifest.clone();
        for (resource, blob) in manifest.resources.iter_mut().zip(blobs) {
            resource.size = blob.len();
        }
        // Serialization of our own manifest types cannot fail.
        let header = serde_json::to_vec(&manifest).unwrap_or_default();

        let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(header.len() as u32).to_le_bytes());
        out.extend_from_slice(&header);
        for blob in blobs {
            out.extend_from_slice(blob);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ResourceEntry, ResourceFormat, ResourceKind};

    fn sample_manifest() -> Manifest {
        Manifest {
            version: 1,
            nodes: Vec::new(),
            resources: vec![
                ResourceEntry {
                    id: "a".to_string(),
                    kind: ResourceKind::TextureBuffer,
                    format: ResourceFormat::Jpg,
                    size: 0,
                    bb_min: None,
                    bb_max: None,
                    texture: None,
                },
                ResourceEntry {
                    id: "b".to_string(),
                    kind: ResourceKind::GeometryBuffer,
                    format: ResourceFormat::Ctm,
                    size: 0,
                    bb_min: None,
                    bb_max: None,
                    texture: Some("a".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_build_parse_round_trip() {
        let blobs = vec![vec![1u8, 2, 3], vec![4u8, 5, 6, 7, 8]];
        let bytes = TilePackage::build(&sample_manifest(), &blobs);
        let package = TilePackage::parse(&bytes).unwrap();

        assert_eq!(package.manifest.resources.len(), 2);
        assert_eq!(package.blobs, blobs);
        assert_eq!(package.manifest.resources[1].size, 5);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = TilePackage::build(&sample_manifest(), &[Vec::new(), Vec::new()]);
        bytes[0] = b'X';
        assert!(matches!(
            TilePackage::parse(&bytes),
            Err(Error::Container { context: "magic", .. })
        ));
    }

    #[test]
    fn test_zero_header_length() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            TilePackage::parse(&bytes),
            Err(Error::Container { context: "header", .. })
        ));
    }

    #[test]
    fn test_truncated_resource() {
        let blobs = vec![vec![1u8, 2, 3], vec![4u8, 5, 6]];
        let mut bytes = TilePackage::build(&sample_manifest(), &blobs);
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            TilePackage::parse(&bytes),
            Err(Error::Container { context: "resource", .. })
        ));
    }
}
