//! Paged-LOD streaming for 3MX tile hierarchies.
//!
//! A 3MX scene is a tree of binary tile containers (`.3mxb`), each
//! holding a JSON manifest plus CTM mesh, JPEG texture, and point cloud
//! buffers. This crate schedules which part of that tree is resident:
//! it culls tiles against camera frustums, refines by projected screen
//! size, stages child containers asynchronously through a bounded
//! priority queue, and evicts least-recently-used subtrees when the
//! resident count exceeds its ceiling.
//!
//! The crate is renderer-agnostic. Hosts provide a [`Fetcher`] for tile
//! bytes and a [`RenderSink`] for lifecycle callbacks, and drive
//! [`Pager::update`] once per rendered frame:
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilestream::{CamState, FileFetcher, Pager, PagerConfig, RenderSink, TileId};
//!
//! struct Sink;
//! impl RenderSink for Sink {
//!     fn create_tile(&mut self, id: TileId, node_id: &str, payloads: &[tilestream::RenderPayload]) {
//!         // Upload meshes/textures, keyed by `id`.
//!     }
//!     fn set_visible(&mut self, id: TileId, visible: bool) {}
//!     fn destroy_tile(&mut self, id: TileId) {}
//! }
//!
//! let fetcher = Arc::new(FileFetcher::new("scene/"));
//! let mut sink = Sink;
//! let mut pager =
//!     Pager::open(fetcher, "Data/root.3mxb", PagerConfig::default(), &mut sink).unwrap();
//! let mut frame = 0u64;
//! loop {
//!     frame += 1;
//!     let cam_states: Vec<CamState> = todo!("one per active camera");
//!     pager.update(frame, &cam_states, &mut sink);
//! }
//! ```

mod container;
mod culling;
mod error;
mod fetch;
mod lru;
mod manifest;
mod queue;
mod scheduler;
mod stage;
mod tree;

pub use container::{MAGIC, TilePackage};
pub use culling::{
    BoundingSphere, CamState, Intersection, Plane, PlaneClipMask, frustum_planes,
    pixel_size_vector,
};
pub use error::{Error, Result};
pub use fetch::{Fetcher, FileFetcher, MemoryFetcher};
pub use manifest::{Layer, Manifest, NodeEntry, ResourceEntry, ResourceFormat, ResourceKind, Scene};
pub use queue::{InlineBackend, Priority, StagingBackend, WorkerPool};
pub use scheduler::{Pager, PagerConfig, PagerStats};
pub use stage::{PointCloud, RenderPayload, StageJob, StagedChild, Texture};
pub use tree::{RenderSink, Status, TileArena, TileId, TileNode};
