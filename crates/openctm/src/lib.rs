//! Encoder and decoder for the OpenCTM compressed triangle mesh format.
//!
//! A CTM file is a small little-endian envelope (magic, version, method
//! tag, counts, comment) followed by a method-specific body:
//!
//! - **RAW** stores plain little-endian arrays.
//! - **MG1** delta-codes triangle indices and entropy-codes everything
//!   through an LZMA-backed packed array layout.
//! - **MG2** additionally quantizes vertex positions against a spatial
//!   grid, encodes normals as spherical offsets from topology-derived
//!   smooth normals, and delta-codes UV/attribute maps in spatial sort
//!   order.
//!
//! # Decoding
//!
//! ```no_run
//! let bytes: Vec<u8> = std::fs::read("model.ctm").unwrap();
//! let decoded = openctm::read_mesh(&bytes).unwrap();
//! println!(
//!     "{} vertices, {} triangles",
//!     decoded.mesh.vertex_count(),
//!     decoded.mesh.triangle_count()
//! );
//! ```
//!
//! # Encoding
//!
//! ```
//! use openctm::{CompressionLevel, Mesh, Method};
//!
//! let mesh = Mesh {
//!     vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
//!     normals: None,
//!     indices: vec![0, 1, 2],
//!     uv_maps: Vec::new(),
//!     attributes: Vec::new(),
//! };
//! let bytes = openctm::write_mesh(&mesh, Method::Mg1, "", CompressionLevel::DEFAULT).unwrap();
//! let decoded = openctm::read_mesh(&bytes).unwrap();
//! assert_eq!(decoded.mesh.vertices, mesh.vertices);
//! ```
//!
//! Every decode owns its scratch buffers; no state is shared between
//! calls, and the same byte slice decodes deterministically on any host
//! endianness.

mod entropy;
mod error;
mod file;
mod grid;
pub mod indices;
mod io;
mod mesh;
mod mg2;
pub mod normals;
mod packed;

pub use entropy::CompressionLevel;
pub use error::{Error, FormatError, IntegrityError, Result};
pub use file::{
    DecodedFile, FORMAT_VERSION, Method, Mg2Params, OCTM, decode_split, read_mesh, split_mesh,
    write_mesh, write_mesh_mg2,
};
pub use grid::{Grid, setup_grid};
pub use io::{Reader, Tag, Writer};
pub use mesh::{
    ATTRIBUTE_ELEMENTS, AttributeData, Mesh, NORMAL_ELEMENTS, POSITION_ELEMENTS, UV_ELEMENTS,
};
pub use mg2::{STANDARD_NORMAL_PRECISION, STANDARD_VERTEX_PRECISION};
