//! The CTM file envelope: header, method dispatch, and the per-method
//! section bodies.
//!
//! The three compression methods are a closed set dispatched by tag, so
//! they live here as an enum plus per-variant section readers/writers
//! rather than a type hierarchy; the shared index delta math sits in
//! [`crate::indices`].

use crate::entropy::CompressionLevel;
use crate::error::{Error, FormatError, Result};
use crate::grid::{Grid, setup_grid};
use crate::indices::{make_index_deltas, rearrange_triangles, restore_indices};
use crate::io::{Reader, Tag, Writer};
use crate::mesh::{
    ATTRIBUTE_ELEMENTS, AttributeData, Mesh, NORMAL_ELEMENTS, POSITION_ELEMENTS, UV_ELEMENTS,
};
use crate::mg2;
use crate::packed::{
    read_packed_floats, read_packed_ints, write_packed_floats, write_packed_ints,
};

/// File magic.
pub const OCTM: Tag = Tag(*b"OCTM");
/// The format version all three methods share.
pub const FORMAT_VERSION: u32 = 5;

const RAW_TAG: Tag = Tag(*b"RAW\0");
const MG1_TAG: Tag = Tag(*b"MG1\0");
const MG2_TAG: Tag = Tag(*b"MG2\0");

const MG2_HEADER: Tag = Tag(*b"MG2H");
const INDX: Tag = Tag(*b"INDX");
const VERT: Tag = Tag(*b"VERT");
const GIDX: Tag = Tag(*b"GIDX");
const NORM: Tag = Tag(*b"NORM");
const TEXC: Tag = Tag(*b"TEXC");
const ATTR: Tag = Tag(*b"ATTR");

/// Header flag bit: the file carries vertex normals.
const HAS_NORMALS_BIT: u32 = 1;

/// The compression method of a CTM file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Uncompressed little-endian arrays.
    Raw,
    /// Entropy-coded packed arrays with triangle index deltas.
    Mg1,
    /// MG1 plus grid-quantized vertices, spherical normals, and
    /// fixed-point attribute deltas.
    Mg2,
}

impl Method {
    /// The method's four-byte tag.
    #[must_use]
    pub fn tag(self) -> Tag {
        match self {
            Method::Raw => RAW_TAG,
            Method::Mg1 => MG1_TAG,
            Method::Mg2 => MG2_TAG,
        }
    }

    /// Select the decoder for a (tag, version) pair, trying RAW, MG1,
    /// MG2 in that order. `None` means the file is unsupported.
    #[must_use]
    pub fn from_tag(tag: Tag, version: u32) -> Option<Self> {
        if version != FORMAT_VERSION {
            return None;
        }
        [Method::Raw, Method::Mg1, Method::Mg2]
            .into_iter()
            .find(|m| m.tag() == tag)
    }
}

/// The fixed-size header counts preceding the method body.
#[derive(Debug, Clone, Copy)]
struct MeshInfo {
    vertex_count: usize,
    triangle_count: usize,
    uv_map_count: usize,
    attribute_count: usize,
    flags: u32,
}

impl MeshInfo {
    fn has_normals(&self) -> bool {
        self.flags & HAS_NORMALS_BIT != 0
    }
}

/// A decoded CTM file: the mesh and the free-form file comment.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFile {
    /// The decoded, integrity-checked mesh.
    pub mesh: Mesh,
    /// The comment string stored in the file header.
    pub comment: String,
}

/// Decode a CTM file.
///
/// Reads the envelope, dispatches on the method tag, and runs the full
/// mesh integrity check before returning; a mesh that decodes cleanly
/// but violates its invariants is an error, never a warning.
pub fn read_mesh(data: &[u8]) -> Result<DecodedFile> {
    let mut r = Reader::new(data);

    let magic = r.read_tag().map_err(Error::Format)?;
    if magic != OCTM {
        return Err(FormatError::BadMagic { found: magic }.into());
    }

    let version = r.read_u32("format version").map_err(Error::Format)?;
    let method_tag = r.read_tag().map_err(Error::Format)?;

    let info = MeshInfo {
        vertex_count: r.read_u32("vertex count").map_err(Error::Format)? as usize,
        triangle_count: r.read_u32("triangle count").map_err(Error::Format)? as usize,
        uv_map_count: r.read_u32("uv map count").map_err(Error::Format)? as usize,
        attribute_count: r.read_u32("attribute count").map_err(Error::Format)? as usize,
        flags: r.read_u32("flags").map_err(Error::Format)?,
    };
    let comment = r.read_string().map_err(Error::Format)?;

    let Some(method) = Method::from_tag(method_tag, version) else {
        return Err(FormatError::UnsupportedFormat {
            tag: method_tag,
            version,
        }
        .into());
    };

    let mesh = match method {
        Method::Raw => read_raw_body(&mut r, &info)?,
        Method::Mg1 => read_mg1_body(&mut r, &info)?,
        Method::Mg2 => read_mg2_body(&mut r, &info)?,
    };

    mesh.check_integrity().map_err(Error::Integrity)?;

    Ok(DecodedFile { mesh, comment })
}

/// Encode a mesh as a CTM file.
///
/// The mesh is integrity-checked first; encoding never mutates it (the
/// index-reordering methods work on copies).
pub fn write_mesh(
    mesh: &Mesh,
    method: Method,
    comment: &str,
    level: CompressionLevel,
) -> Result<Vec<u8>> {
    mesh.check_integrity().map_err(Error::Integrity)?;

    let mut flags = 0u32;
    if mesh.has_normals() {
        flags |= HAS_NORMALS_BIT;
    }

    let mut w = Writer::new();
    w.write_tag(OCTM);
    w.write_u32(FORMAT_VERSION);
    w.write_tag(method.tag());
    w.write_u32(mesh.vertex_count() as u32);
    w.write_u32(mesh.triangle_count() as u32);
    w.write_u32(mesh.uv_map_count() as u32);
    w.write_u32(mesh.attribute_count() as u32);
    w.write_u32(flags);
    w.write_string(comment);

    match method {
        Method::Raw => write_raw_body(&mut w, mesh),
        Method::Mg1 => write_mg1_body(&mut w, mesh, level)?,
        Method::Mg2 => write_mg2_body(&mut w, mesh, level)?,
    }

    Ok(w.into_inner())
}

// --- RAW -----------------------------------------------------------------

fn write_raw_body(w: &mut Writer, mesh: &Mesh) {
    w.write_tag(INDX);
    for &i in &mesh.indices {
        w.write_u32(i);
    }

    w.write_tag(VERT);
    w.write_f32_array(&mesh.vertices);

    if let Some(normals) = &mesh.normals {
        w.write_tag(NORM);
        w.write_f32_array(normals);
    }

    for map in &mesh.uv_maps {
        w.write_tag(TEXC);
        w.write_string(&map.name);
        w.write_string(map.material_name.as_deref().unwrap_or(""));
        w.write_f32_array(&map.values);
    }

    for map in &mesh.attributes {
        w.write_tag(ATTR);
        w.write_string(&map.name);
        w.write_f32_array(&map.values);
    }
}

fn read_raw_body(r: &mut Reader<'_>, info: &MeshInfo) -> Result<Mesh> {
    r.expect_tag(INDX).map_err(Error::Format)?;
    let raw = r
        .read_i32_array(info.triangle_count * 3, "indices")
        .map_err(Error::Format)?;
    let indices: Vec<u32> = raw.into_iter().map(|v| v as u32).collect();

    r.expect_tag(VERT).map_err(Error::Format)?;
    let vertices = r
        .read_f32_array(info.vertex_count * POSITION_ELEMENTS, "vertices")
        .map_err(Error::Format)?;

    let normals = if info.has_normals() {
        r.expect_tag(NORM).map_err(Error::Format)?;
        Some(
            r.read_f32_array(info.vertex_count * NORMAL_ELEMENTS, "normals")
                .map_err(Error::Format)?,
        )
    } else {
        None
    };

    let mut uv_maps = Vec::with_capacity(info.uv_map_count);
    for _ in 0..info.uv_map_count {
        r.expect_tag(TEXC).map_err(Error::Format)?;
        let name = r.read_string().map_err(Error::Format)?;
        let material = r.read_string().map_err(Error::Format)?;
        let values = r
            .read_f32_array(info.vertex_count * UV_ELEMENTS, "texcoords")
            .map_err(Error::Format)?;
        uv_maps.push(AttributeData {
            name,
            material_name: none_if_empty(material),
            precision: AttributeData::STANDARD_UV_PRECISION,
            values,
        });
    }

    let mut attributes = Vec::with_capacity(info.attribute_count);
    for _ in 0..info.attribute_count {
        r.expect_tag(ATTR).map_err(Error::Format)?;
        let name = r.read_string().map_err(Error::Format)?;
        let values = r
            .read_f32_array(info.vertex_count * ATTRIBUTE_ELEMENTS, "attributes")
            .map_err(Error::Format)?;
        attributes.push(AttributeData {
            name,
            material_name: None,
            precision: AttributeData::STANDARD_PRECISION,
            values,
        });
    }

    Ok(Mesh {
        vertices,
        normals,
        indices,
        uv_maps,
        attributes,
    })
}

// --- MG1 -----------------------------------------------------------------

fn write_mg1_body(w: &mut Writer, mesh: &Mesh, level: CompressionLevel) -> Result<()> {
    w.write_tag(INDX);
    let mut indices = mesh.indices.clone();
    rearrange_triangles(&mut indices);
    let mut deltas: Vec<i32> = indices.iter().map(|&i| i as i32).collect();
    make_index_deltas(&mut deltas);
    write_packed_ints(w, &deltas, mesh.triangle_count(), 3, false, level)
        .map_err(Error::Format)?;

    w.write_tag(VERT);
    write_packed_floats(w, &mesh.vertices, mesh.vertices.len(), 1, level)
        .map_err(Error::Format)?;

    if let Some(normals) = &mesh.normals {
        w.write_tag(NORM);
        write_packed_floats(w, normals, mesh.vertex_count(), NORMAL_ELEMENTS, level)
            .map_err(Error::Format)?;
    }

    for map in &mesh.uv_maps {
        w.write_tag(TEXC);
        w.write_string(&map.name);
        w.write_string(map.material_name.as_deref().unwrap_or(""));
        write_packed_floats(w, &map.values, mesh.vertex_count(), UV_ELEMENTS, level)
            .map_err(Error::Format)?;
    }

    for map in &mesh.attributes {
        w.write_tag(ATTR);
        w.write_string(&map.name);
        write_packed_floats(w, &map.values, mesh.vertex_count(), ATTRIBUTE_ELEMENTS, level)
            .map_err(Error::Format)?;
    }
    Ok(())
}

fn read_mg1_body(r: &mut Reader<'_>, info: &MeshInfo) -> Result<Mesh> {
    r.expect_tag(INDX).map_err(Error::Format)?;
    let mut deltas =
        read_packed_ints(r, info.triangle_count, 3, false).map_err(Error::Format)?;
    restore_indices(&mut deltas);
    let indices = checked_indices(deltas, info.vertex_count)?;

    r.expect_tag(VERT).map_err(Error::Format)?;
    let vertices = read_packed_floats(r, info.vertex_count * POSITION_ELEMENTS, 1)
        .map_err(Error::Format)?;

    let normals = if info.has_normals() {
        r.expect_tag(NORM).map_err(Error::Format)?;
        Some(
            read_packed_floats(r, info.vertex_count, NORMAL_ELEMENTS)
                .map_err(Error::Format)?,
        )
    } else {
        None
    };

    let mut uv_maps = Vec::with_capacity(info.uv_map_count);
    for _ in 0..info.uv_map_count {
        r.expect_tag(TEXC).map_err(Error::Format)?;
        let name = r.read_string().map_err(Error::Format)?;
        let material = r.read_string().map_err(Error::Format)?;
        let values =
            read_packed_floats(r, info.vertex_count, UV_ELEMENTS).map_err(Error::Format)?;
        uv_maps.push(AttributeData {
            name,
            material_name: none_if_empty(material),
            precision: AttributeData::STANDARD_UV_PRECISION,
            values,
        });
    }

    let mut attributes = Vec::with_capacity(info.attribute_count);
    for _ in 0..info.attribute_count {
        r.expect_tag(ATTR).map_err(Error::Format)?;
        let name = r.read_string().map_err(Error::Format)?;
        let values = read_packed_floats(r, info.vertex_count, ATTRIBUTE_ELEMENTS)
            .map_err(Error::Format)?;
        attributes.push(AttributeData {
            name,
            material_name: None,
            precision: AttributeData::STANDARD_PRECISION,
            values,
        });
    }

    Ok(Mesh {
        vertices,
        normals,
        indices,
        uv_maps,
        attributes,
    })
}

// --- MG2 -----------------------------------------------------------------

/// Parameters for the MG2 quantizing encoder.
#[derive(Debug, Clone, Copy)]
pub struct Mg2Params {
    /// Vertex position quantization step.
    pub vertex_precision: f32,
    /// Normal magnitude/angle quantization step.
    pub normal_precision: f32,
}

impl Default for Mg2Params {
    fn default() -> Self {
        Self {
            vertex_precision: mg2::STANDARD_VERTEX_PRECISION,
            normal_precision: mg2::STANDARD_NORMAL_PRECISION,
        }
    }
}

fn write_mg2_body(w: &mut Writer, mesh: &Mesh, level: CompressionLevel) -> Result<()> {
    write_mg2_body_with(w, mesh, Mg2Params::default(), level)
}

/// MG2 body writer with explicit precisions, used by [`write_mesh_mg2`].
fn write_mg2_body_with(
    w: &mut Writer,
    mesh: &Mesh,
    params: Mg2Params,
    level: CompressionLevel,
) -> Result<()> {
    let vc = mesh.vertex_count();
    let grid = setup_grid(&mesh.vertices);
    let sorted = mg2::sort_vertices(&grid, &mesh.vertices);
    let vertex_deltas =
        mg2::make_vertex_deltas(&mesh.vertices, &sorted, &grid, params.vertex_precision);
    let grid_index_deltas = mg2::grid_index_deltas(&sorted);

    w.write_tag(MG2_HEADER);
    w.write_f32(params.vertex_precision);
    w.write_f32(params.normal_precision);
    grid.write_to(w);

    w.write_tag(VERT);
    write_packed_ints(w, &vertex_deltas, vc, POSITION_ELEMENTS, false, level)
        .map_err(Error::Format)?;

    w.write_tag(GIDX);
    write_packed_ints(w, &grid_index_deltas, vc, 1, false, level).map_err(Error::Format)?;

    w.write_tag(INDX);
    let mut indices = mg2::reindex_indices(&sorted, &mesh.indices);
    rearrange_triangles(&mut indices);
    let mut index_deltas: Vec<i32> = indices.iter().map(|&i| i as i32).collect();
    make_index_deltas(&mut index_deltas);
    write_packed_ints(w, &index_deltas, mesh.triangle_count(), 3, false, level)
        .map_err(Error::Format)?;

    if let Some(normals) = &mesh.normals {
        // Encode against the positions the decoder will reconstruct,
        // so both sides derive the same smooth-normal frame.
        let mut absolute = grid_index_deltas;
        for i in 1..vc {
            absolute[i] += absolute[i - 1];
        }
        let restored =
            mg2::restore_vertices(&vertex_deltas, &absolute, &grid, params.vertex_precision);

        w.write_tag(NORM);
        let int_normals = mg2::make_normal_deltas(
            &restored,
            normals,
            &indices,
            &sorted,
            params.normal_precision,
        );
        write_packed_ints(w, &int_normals, vc, NORMAL_ELEMENTS, false, level)
            .map_err(Error::Format)?;
    }

    for map in &mesh.uv_maps {
        w.write_tag(TEXC);
        w.write_string(&map.name);
        w.write_string(map.material_name.as_deref().unwrap_or(""));
        w.write_f32(map.precision);
        let deltas = mg2::make_uv_deltas(&map.values, map.precision, &sorted);
        write_packed_ints(w, &deltas, vc, UV_ELEMENTS, true, level).map_err(Error::Format)?;
    }

    for map in &mesh.attributes {
        w.write_tag(ATTR);
        w.write_string(&map.name);
        w.write_f32(map.precision);
        let deltas = mg2::make_attribute_deltas(&map.values, map.precision, &sorted);
        write_packed_ints(w, &deltas, vc, ATTRIBUTE_ELEMENTS, true, level)
            .map_err(Error::Format)?;
    }
    Ok(())
}

/// Encode a mesh with the MG2 method and explicit precisions.
pub fn write_mesh_mg2(
    mesh: &Mesh,
    params: Mg2Params,
    comment: &str,
    level: CompressionLevel,
) -> Result<Vec<u8>> {
    mesh.check_integrity().map_err(Error::Integrity)?;

    let mut flags = 0u32;
    if mesh.has_normals() {
        flags |= HAS_NORMALS_BIT;
    }

    let mut w = Writer::new();
    w.write_tag(OCTM);
    w.write_u32(FORMAT_VERSION);
    w.write_tag(MG2_TAG);
    w.write_u32(mesh.vertex_count() as u32);
    w.write_u32(mesh.triangle_count() as u32);
    w.write_u32(mesh.uv_map_count() as u32);
    w.write_u32(mesh.attribute_count() as u32);
    w.write_u32(flags);
    w.write_string(comment);
    write_mg2_body_with(&mut w, mesh, params, level)?;
    Ok(w.into_inner())
}

fn read_mg2_body(r: &mut Reader<'_>, info: &MeshInfo) -> Result<Mesh> {
    let vc = info.vertex_count;

    r.expect_tag(MG2_HEADER).map_err(Error::Format)?;
    let vertex_precision = r.read_f32("vertex precision").map_err(Error::Format)?;
    let normal_precision = r.read_f32("normal precision").map_err(Error::Format)?;

    let grid = Grid::from_reader(r).map_err(Error::Format)?;
    if !grid.is_valid() {
        return Err(FormatError::Invalid {
            context: "grid",
            detail: "the vertex grid is corrupt".to_string(),
        }
        .into());
    }

    r.expect_tag(VERT).map_err(Error::Format)?;
    let int_vertices =
        read_packed_ints(r, vc, POSITION_ELEMENTS, false).map_err(Error::Format)?;

    r.expect_tag(GIDX).map_err(Error::Format)?;
    let mut grid_indices = read_packed_ints(r, vc, 1, false).map_err(Error::Format)?;
    for i in 1..vc {
        grid_indices[i] += grid_indices[i - 1];
    }

    let vertices = mg2::restore_vertices(&int_vertices, &grid_indices, &grid, vertex_precision);

    r.expect_tag(INDX).map_err(Error::Format)?;
    let mut index_deltas =
        read_packed_ints(r, info.triangle_count, 3, false).map_err(Error::Format)?;
    restore_indices(&mut index_deltas);
    let indices = checked_indices(index_deltas, vc)?;

    let normals = if info.has_normals() {
        r.expect_tag(NORM).map_err(Error::Format)?;
        let int_normals =
            read_packed_ints(r, vc, NORMAL_ELEMENTS, false).map_err(Error::Format)?;
        Some(mg2::restore_normals(
            &int_normals,
            &vertices,
            &indices,
            normal_precision,
        ))
    } else {
        None
    };

    let mut uv_maps = Vec::with_capacity(info.uv_map_count);
    for _ in 0..info.uv_map_count {
        r.expect_tag(TEXC).map_err(Error::Format)?;
        let name = r.read_string().map_err(Error::Format)?;
        let material = r.read_string().map_err(Error::Format)?;
        let precision = checked_precision(r, "uv")?;
        let ints = read_packed_ints(r, vc, UV_ELEMENTS, true).map_err(Error::Format)?;
        uv_maps.push(AttributeData {
            name,
            material_name: none_if_empty(material),
            precision,
            values: mg2::restore_uv_coords(&ints, precision),
        });
    }

    let mut attributes = Vec::with_capacity(info.attribute_count);
    for _ in 0..info.attribute_count {
        r.expect_tag(ATTR).map_err(Error::Format)?;
        let name = r.read_string().map_err(Error::Format)?;
        let precision = checked_precision(r, "attribute")?;
        let ints = read_packed_ints(r, vc, ATTRIBUTE_ELEMENTS, true).map_err(Error::Format)?;
        attributes.push(AttributeData {
            name,
            material_name: None,
            precision,
            values: mg2::restore_attributes(&ints, precision),
        });
    }

    Ok(Mesh {
        vertices,
        normals,
        indices,
        uv_maps,
        attributes,
    })
}

// --- shared helpers ------------------------------------------------------

fn none_if_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn checked_precision(r: &mut Reader<'_>, context: &'static str) -> Result<f32> {
    let precision = r.read_f32("precision").map_err(Error::Format)?;
    if precision <= 0.0 {
        return Err(FormatError::Invalid {
            context,
            detail: format!("a precision value of {precision} <= 0.0 was read"),
        }
        .into());
    }
    Ok(precision)
}

/// Convert restored index deltas to u32, rejecting anything outside
/// `[0, vertex_count)` before downstream passes walk the topology.
fn checked_indices(deltas: Vec<i32>, vertex_count: usize) -> Result<Vec<u32>> {
    let mut indices = Vec::with_capacity(deltas.len());
    for v in deltas {
        if v < 0 || v as usize >= vertex_count {
            return Err(FormatError::Invalid {
                context: "indices",
                detail: format!("index {v} points to a nonexistent vertex"),
            }
            .into());
        }
        indices.push(v as u32);
    }
    Ok(indices)
}

// --- oversized-mesh splitting --------------------------------------------

/// Split a mesh whose vertex count exceeds `max_vertices` into shards
/// whose referenced vertex spans each fit under the ceiling.
///
/// The triangle stream is partitioned into contiguous runs; each shard
/// copies the vertex range its run references and remaps indices to be
/// shard-local. Only positions and the first UV map survive splitting —
/// normals and generic attributes are intentionally dropped, matching
/// the established behavior of this pipeline.
///
/// A run always holds at least one triangle, so a single triangle whose
/// own span exceeds the ceiling still produces (an oversized) shard
/// rather than failing.
#[must_use]
pub fn split_mesh(mesh: &Mesh, max_vertices: usize) -> Vec<Mesh> {
    let uv = mesh.uv_maps.first();

    let mut shards = Vec::new();
    let mut run_start = 0usize;
    let mut span: Option<(u32, u32)> = None;

    let triangle_count = mesh.triangle_count();
    for t in 0..=triangle_count {
        let close_run = if t == triangle_count {
            t > run_start
        } else {
            let tri = &mesh.indices[t * 3..t * 3 + 3];
            let tri_min = tri.iter().copied().min().unwrap_or(0);
            let tri_max = tri.iter().copied().max().unwrap_or(0);
            match span {
                None => {
                    span = Some((tri_min, tri_max));
                    false
                }
                Some((mn, mx)) => {
                    let merged = (mn.min(tri_min), mx.max(tri_max));
                    if (merged.1 - merged.0 + 1) as usize > max_vertices && t > run_start {
                        true
                    } else {
                        span = Some(merged);
                        false
                    }
                }
            }
        };

        if close_run {
            let (mn, mx) = span.take().unwrap_or((0, 0));
            shards.push(build_shard(mesh, uv, run_start, t, mn, mx));
            run_start = t;
            if t < triangle_count {
                let tri = &mesh.indices[t * 3..t * 3 + 3];
                span = Some((
                    tri.iter().copied().min().unwrap_or(0),
                    tri.iter().copied().max().unwrap_or(0),
                ));
            }
        }
    }

    shards
}

fn build_shard(
    mesh: &Mesh,
    uv: Option<&AttributeData>,
    tri_start: usize,
    tri_end: usize,
    min_vertex: u32,
    max_vertex: u32,
) -> Mesh {
    let (mn, mx) = (min_vertex as usize, max_vertex as usize);

    let vertices = mesh.vertices[mn * POSITION_ELEMENTS..(mx + 1) * POSITION_ELEMENTS].to_vec();

    let indices: Vec<u32> = mesh.indices[tri_start * 3..tri_end * 3]
        .iter()
        .map(|&i| i - min_vertex)
        .collect();

    let uv_maps = uv
        .map(|map| {
            vec![AttributeData {
                name: map.name.clone(),
                material_name: map.material_name.clone(),
                precision: map.precision,
                values: map.values[mn * UV_ELEMENTS..(mx + 1) * UV_ELEMENTS].to_vec(),
            }]
        })
        .unwrap_or_default();

    Mesh {
        vertices,
        normals: None,
        indices,
        uv_maps,
        attributes: Vec::new(),
    }
}

/// Decode a CTM file and split the result if it exceeds the per-mesh
/// vertex ceiling.
///
/// Returns the (possibly singleton) mesh list plus the file comment.
pub fn decode_split(data: &[u8], max_vertices: usize) -> Result<(Vec<Mesh>, String)> {
    let decoded = read_mesh(data)?;
    let meshes = if decoded.mesh.vertex_count() > max_vertices {
        split_mesh(&decoded.mesh, max_vertices)
    } else {
        vec![decoded.mesh]
    };
    Ok((meshes, decoded.comment))
}
