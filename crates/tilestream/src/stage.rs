//! Staging: the background fetch-and-decode of a tile's children.
//!
//! A staging job owns everything it needs (paths, fetcher, channels);
//! workers never touch the tile tree. Decoded resources are cached per
//! batch only, so parallel batches share nothing mutable. CTM decodes
//! run one at a time across all workers, through a shared lock; the
//! rest of a batch (fetch, container parse, texture decode) runs in
//! parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};

use glam::Vec3;

use crate::container::TilePackage;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, join_path, parent_dir};
use crate::manifest::{ResourceFormat, ResourceKind};
use crate::tree::TileId;

/// A decoded RGB8 texture.
#[derive(Debug, Clone)]
pub struct Texture {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Raw RGB8 pixel data, three bytes per pixel.
    pub rgb: Vec<u8>,
}

/// A decoded point cloud.
#[derive(Debug, Clone)]
pub struct PointCloud {
    /// Point positions, three components per point.
    pub positions: Vec<f32>,
    /// Point colors, RGBA, four bytes per point.
    pub colors: Vec<u8>,
}

/// One renderable resource handed to the host when a tile commits.
///
/// Payloads are shared (`Arc`) because several nodes of one staging
/// batch may reference the same decoded resource.
#[derive(Debug, Clone)]
pub enum RenderPayload {
    /// A triangle mesh with an optional texture.
    TexturedMesh {
        /// The decoded (and possibly split) mesh.
        mesh: Arc<openctm::Mesh>,
        /// The texture it is mapped with, when one was declared.
        texture: Option<Arc<Texture>>,
    },
    /// A colored point cloud.
    PointCloud(Arc<PointCloud>),
}

/// A fully staged child tile, ready to be committed into the tree.
#[derive(Debug, Clone)]
pub struct StagedChild {
    /// The node id from the manifest.
    pub id: String,
    /// Directory context for the child's own children.
    pub dir: String,
    /// Minimum corner of the bounding box.
    pub bb_min: Vec3,
    /// Maximum corner of the bounding box.
    pub bb_max: Vec3,
    /// LOD refinement threshold in screen pixels.
    pub max_screen_diameter: f32,
    /// Relative paths of the child's own child containers.
    pub children_files: Vec<String>,
    /// Renderable resources for this node.
    pub payloads: Vec<RenderPayload>,
}

/// Everything a worker needs to stage one tile's children.
pub struct StageJob {
    pub(crate) tile: TileId,
    pub(crate) dir: String,
    pub(crate) children_files: Vec<String>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) decode_lock: Arc<Mutex<()>>,
    pub(crate) max_vertices_per_mesh: usize,
    pub(crate) results: mpsc::Sender<StageOutcome>,
}

impl StageJob {
    /// Execute the job and report its outcome to the scheduler.
    ///
    /// Custom [`crate::StagingBackend`] implementations call this from
    /// whatever execution context they manage; everything the job
    /// needs travels inside it.
    pub fn run(self) {
        run_job(self);
    }
}

impl std::fmt::Debug for StageJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageJob")
            .field("tile", &self.tile)
            .field("dir", &self.dir)
            .field("children_files", &self.children_files)
            .finish_non_exhaustive()
    }
}

/// The result of one staging batch, sent back to the scheduler.
#[derive(Debug)]
pub(crate) struct StageOutcome {
    pub tile: TileId,
    pub result: Result<Vec<StagedChild>>,
}

/// Execute a staging job and report its outcome.
///
/// Never panics across the channel: all failures travel as values. A
/// closed result channel means the scheduler is gone and the outcome is
/// discarded.
pub(crate) fn run_job(job: StageJob) {
    let result = stage_children(&job);
    let outcome = StageOutcome {
        tile: job.tile,
        result,
    };
    let _ = job.results.send(outcome);
}

/// Fetch and decode every child container of the job's tile.
///
/// The batch only succeeds when all children are done; there is no
/// ordering guarantee between the children of one batch, and no partial
/// result on failure.
fn stage_children(job: &StageJob) -> Result<Vec<StagedChild>> {
    let mut children = Vec::new();
    for file in &job.children_files {
        let path = join_path(&job.dir, file);
        let bytes = job.fetcher.fetch(&path)?;
        let package = TilePackage::parse(&bytes)?;
        let child_dir = parent_dir(&path);
        build_children(
            &package,
            &child_dir,
            &job.decode_lock,
            job.max_vertices_per_mesh,
            &mut children,
        )?;
    }
    Ok(children)
}

/// Fetch, parse, and assemble the nodes of a single container; used by
/// the scheduler to stage the root tier synchronously at open time.
pub(crate) fn build_root_children(
    fetcher: &dyn Fetcher,
    root_path: &str,
    dir: &str,
    decode_lock: &Mutex<()>,
    max_vertices_per_mesh: usize,
) -> Result<Vec<StagedChild>> {
    let bytes = fetcher.fetch(root_path)?;
    let package = TilePackage::parse(&bytes)?;
    let mut children = Vec::new();
    build_children(&package, dir, decode_lock, max_vertices_per_mesh, &mut children)?;
    Ok(children)
}

/// Decode a package's resources and assemble its staged nodes.
fn build_children(
    package: &TilePackage,
    dir: &str,
    decode_lock: &Mutex<()>,
    max_vertices_per_mesh: usize,
    out: &mut Vec<StagedChild>,
) -> Result<()> {
    // Per-batch caches: resources are shared between nodes of the same
    // container but never across unrelated staging batches.
    let mut textures: HashMap<&str, Arc<Texture>> = HashMap::new();
    let mut meshes: HashMap<&str, Vec<Arc<openctm::Mesh>>> = HashMap::new();
    let mut point_clouds: HashMap<&str, Arc<PointCloud>> = HashMap::new();
    let mut mesh_textures: HashMap<&str, Option<&str>> = HashMap::new();

    for (resource, blob) in package.manifest.resources.iter().zip(&package.blobs) {
        match (resource.kind, resource.format) {
            (ResourceKind::TextureBuffer, ResourceFormat::Jpg) => {
                if !textures.contains_key(resource.id.as_str()) {
                    textures.insert(resource.id.as_str(), Arc::new(decode_texture(blob)?));
                }
            }
            (ResourceKind::GeometryBuffer, ResourceFormat::Ctm) => {
                if !meshes.contains_key(resource.id.as_str()) {
                    // One CTM decode at a time, lock held for exactly
                    // one call.
                    let decoded = {
                        let _guard = decode_lock.lock().unwrap();
                        openctm::decode_split(blob, max_vertices_per_mesh)?
                    };
                    meshes.insert(
                        resource.id.as_str(),
                        decoded.0.into_iter().map(Arc::new).collect(),
                    );
                    mesh_textures.insert(resource.id.as_str(), resource.texture.as_deref());
                }
            }
            (ResourceKind::GeometryBuffer, ResourceFormat::Xyz) => {
                if !point_clouds.contains_key(resource.id.as_str()) {
                    point_clouds.insert(resource.id.as_str(), Arc::new(decode_point_cloud(blob)?));
                }
            }
            (kind, format) => {
                tracing::warn!(
                    "skipping unexpected buffer \"{}\" ({kind:?}/{format:?})",
                    resource.id
                );
            }
        }
    }

    for node in &package.manifest.nodes {
        let mut payloads = Vec::with_capacity(node.resources.len());
        for resource_id in &node.resources {
            if let Some(node_meshes) = meshes.get(resource_id.as_str()) {
                let texture = mesh_textures
                    .get(resource_id.as_str())
                    .copied()
                    .flatten()
                    .and_then(|tex_id| textures.get(tex_id).cloned());
                for mesh in node_meshes {
                    payloads.push(RenderPayload::TexturedMesh {
                        mesh: Arc::clone(mesh),
                        texture: texture.clone(),
                    });
                }
            } else if let Some(cloud) = point_clouds.get(resource_id.as_str()) {
                payloads.push(RenderPayload::PointCloud(Arc::clone(cloud)));
            }
        }

        out.push(StagedChild {
            id: node.id.clone(),
            dir: dir.to_string(),
            bb_min: Vec3::from_array(node.bb_min),
            bb_max: Vec3::from_array(node.bb_max),
            max_screen_diameter: node.max_screen_diameter,
            children_files: node.children.clone(),
            payloads,
        });
    }
    Ok(())
}

/// Decode a JPEG texture buffer to raw RGB8.
fn decode_texture(blob: &[u8]) -> Result<Texture> {
    let image = image::load_from_memory_with_format(blob, image::ImageFormat::Jpeg)
        .map_err(|e| Error::Texture {
            message: e.to_string(),
        })?
        .into_rgb8();
    Ok(Texture {
        width: image.width(),
        height: image.height(),
        rgb: image.into_raw(),
    })
}

/// Decode an `xyz` point cloud buffer: point count, positions, colors.
fn decode_point_cloud(blob: &[u8]) -> Result<PointCloud> {
    let mut r = openctm::Reader::new(blob);
    let count = r
        .read_u32("point count")
        .map_err(openctm::Error::Format)? as usize;
    let positions = r
        .read_f32_array(count * 3, "point positions")
        .map_err(openctm::Error::Format)?;
    let colors = r
        .read_bytes(count * 4, "point colors")
        .map_err(openctm::Error::Format)?
        .to_vec();
    Ok(PointCloud { positions, colors })
}
