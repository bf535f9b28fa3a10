//! MG2 quantization and delta transforms.
//!
//! Pure numeric halves of the MG2 codec: vertex sorting and grid
//! quantization, the spherical normal transform, and the fixed-point
//! UV/attribute deltas. Section framing lives in the `file` module.

use std::f64::consts::PI;

use crate::grid::Grid;
use crate::mesh::{ATTRIBUTE_ELEMENTS, UV_ELEMENTS};
use crate::normals::{calc_smooth_normals, normal_basis};

/// The encoder's customary vertex precision.
pub const STANDARD_VERTEX_PRECISION: f32 = 1.0 / 1024.0;
/// The encoder's customary normal precision.
pub const STANDARD_NORMAL_PRECISION: f32 = 1.0 / 256.0;

/// A vertex prepared for the spatial sort.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SortableVertex {
    /// Raw X coordinate, the secondary sort key.
    pub x: f32,
    /// Flattened grid cell index, the primary sort key.
    pub grid_index: i32,
    /// Index of the vertex before sorting.
    pub original_index: usize,
}

/// Sort vertices by (grid cell, then x coordinate).
///
/// This order is load-bearing: the X-component deltas and the
/// UV/attribute deltas both rely on the spatial locality it produces.
pub(crate) fn sort_vertices(grid: &Grid, vertices: &[f32]) -> Vec<SortableVertex> {
    let mut sorted: Vec<SortableVertex> = vertices
        .chunks_exact(3)
        .enumerate()
        .map(|(i, v)| SortableVertex {
            x: v[0],
            grid_index: grid.point_to_cell([v[0], v[1], v[2]]),
            original_index: i,
        })
        .collect();
    sorted.sort_by(|a, b| {
        a.grid_index
            .cmp(&b.grid_index)
            .then_with(|| a.x.total_cmp(&b.x))
    });
    sorted
}

/// Rewrite triangle indices through the sort permutation.
pub(crate) fn reindex_indices(sorted: &[SortableVertex], indices: &[u32]) -> Vec<u32> {
    let mut lut = vec![0u32; sorted.len()];
    for (new_idx, sv) in sorted.iter().enumerate() {
        lut[sv.original_index] = new_idx as u32;
    }
    indices.iter().map(|&i| lut[i as usize]).collect()
}

/// Quantize sorted vertices against their grid cell origins.
///
/// The X component is additionally delta-coded against the previous
/// vertex's quantized X, but only while both share a grid cell;
/// crossing a cell boundary resets the delta so quantization error
/// never accumulates across cells.
pub(crate) fn make_vertex_deltas(
    vertices: &[f32],
    sorted: &[SortableVertex],
    grid: &Grid,
    precision: f32,
) -> Vec<i32> {
    let scale = 1.0 / precision;
    let mut prev_grid_index = i32::MAX;
    let mut prev_delta_x = 0i32;

    let mut out = Vec::with_capacity(sorted.len() * 3);
    for sv in sorted {
        let origin = grid.cell_origin(sv.grid_index);
        let old = sv.original_index * 3;

        let delta_x = quantize(scale * (vertices[old] - origin[0]));
        if sv.grid_index == prev_grid_index {
            out.push(delta_x - prev_delta_x);
        } else {
            out.push(delta_x);
        }
        out.push(quantize(scale * (vertices[old + 1] - origin[1])));
        out.push(quantize(scale * (vertices[old + 2] - origin[2])));

        prev_grid_index = sv.grid_index;
        prev_delta_x = delta_x;
    }
    out
}

/// Delta-code the sorted grid cell indices.
pub(crate) fn grid_index_deltas(sorted: &[SortableVertex]) -> Vec<i32> {
    let mut out = Vec::with_capacity(sorted.len());
    for (i, sv) in sorted.iter().enumerate() {
        if i == 0 {
            out.push(sv.grid_index);
        } else {
            out.push(sv.grid_index - sorted[i - 1].grid_index);
        }
    }
    out
}

/// Reverse the vertex quantization.
///
/// `grid_indices` must already be prefix-summed back to absolute cell
/// indices.
pub(crate) fn restore_vertices(
    int_vertices: &[i32],
    grid_indices: &[i32],
    grid: &Grid,
    precision: f32,
) -> Vec<f32> {
    let vc = int_vertices.len() / 3;
    let mut prev_grid_index = i32::MAX;
    let mut prev_delta_x = 0i32;

    let mut vertices = vec![0.0f32; vc * 3];
    for i in 0..vc {
        let grid_index = grid_indices[i];
        let origin = grid.cell_origin(grid_index);

        let mut delta_x = int_vertices[i * 3];
        if grid_index == prev_grid_index {
            delta_x += prev_delta_x;
        }
        vertices[i * 3] = precision * delta_x as f32 + origin[0];
        vertices[i * 3 + 1] = precision * int_vertices[i * 3 + 1] as f32 + origin[1];
        vertices[i * 3 + 2] = precision * int_vertices[i * 3 + 2] as f32 + origin[2];

        prev_grid_index = grid_index;
        prev_delta_x = delta_x;
    }
    vertices
}

/// Quantization step count for theta at a given quantized phi.
///
/// The theta resolution follows the x/y circumference of the phi ring:
/// zero steps at the pole, a fixed scale for small rings, and a
/// phi-proportional scale elsewhere. The decoder inverts the same
/// bands, so this banding is wire format.
fn theta_scale_for_encode(int_phi: i32) -> f64 {
    if int_phi == 0 {
        0.0
    } else if int_phi <= 4 {
        2.0 / PI
    } else {
        f64::from(int_phi) / (2.0 * PI)
    }
}

fn theta_scale_for_decode(int_phi: i32) -> f64 {
    if int_phi == 0 {
        0.0
    } else if int_phi <= 4 {
        PI / 2.0
    } else {
        (2.0 * PI) / f64::from(int_phi)
    }
}

/// Transform true normals into quantized (magnitude, phi, theta)
/// relative to the smooth normals of the restored vertices.
///
/// `vertices` and `indices` are in sorted index space and must be the
/// values the decoder will see (positions restored from the quantized
/// data), so both sides derive the identical nominal frame.
pub(crate) fn make_normal_deltas(
    vertices: &[f32],
    normals: &[f32],
    indices: &[u32],
    sorted: &[SortableVertex],
    precision: f32,
) -> Vec<i32> {
    let smooth = calc_smooth_normals(vertices, indices);
    let scale = 1.0 / precision;

    let vc = vertices.len() / 3;
    let mut out = Vec::with_capacity(vc * 3);
    for (i, sv) in sorted.iter().enumerate().take(vc) {
        let old = sv.original_index * 3;

        let mut magnitude = (normals[old] * normals[old]
            + normals[old + 1] * normals[old + 1]
            + normals[old + 2] * normals[old + 2])
            .sqrt();
        if magnitude < 1e-10 {
            magnitude = 1.0;
        }

        // A normal pointing away from the smooth estimate is encoded
        // with a negated magnitude rather than wrapping the angles.
        if smooth[i * 3] * normals[old]
            + smooth[i * 3 + 1] * normals[old + 1]
            + smooth[i * 3 + 2] * normals[old + 2]
            < 0.0
        {
            magnitude = -magnitude;
        }

        out.push(quantize(scale * magnitude));

        let inv = 1.0 / magnitude;
        let n = [
            normals[old] * inv,
            normals[old + 1] * inv,
            normals[old + 2] * inv,
        ];

        // Express the normal in the basis whose Z axis is the smooth
        // normal, then go spherical.
        let basis = normal_basis(&smooth, i * 3);
        let mut n2 = [0.0f32; 3];
        for (j, value) in n2.iter_mut().enumerate() {
            *value = basis[j * 3] * n[0] + basis[j * 3 + 1] * n[1] + basis[j * 3 + 2] * n[2];
        }

        let phi = if n2[2] >= 1.0 {
            0.0f64
        } else {
            f64::from(n2[2]).acos()
        };
        let theta = f64::from(n2[1]).atan2(f64::from(n2[0]));

        let int_phi = (phi * (f64::from(scale) / (0.5 * PI)) + 0.5).floor() as i32;
        let theta_scale = theta_scale_for_encode(int_phi);
        out.push(int_phi);
        out.push(((theta + PI) * theta_scale + 0.5).floor() as i32);
    }
    out
}

/// Convert quantized (magnitude, phi, theta) normals back to cartesian.
pub(crate) fn restore_normals(
    int_normals: &[i32],
    vertices: &[f32],
    indices: &[u32],
    precision: f32,
) -> Vec<f32> {
    let smooth = calc_smooth_normals(vertices, indices);
    let vc = vertices.len() / 3;

    let mut normals = vec![0.0f32; vc * 3];
    for i in 0..vc {
        let magnitude = int_normals[i * 3] as f32 * precision;

        let int_phi = int_normals[i * 3 + 1];
        let phi = f64::from(int_phi) * (0.5 * PI) * f64::from(precision);
        let theta =
            f64::from(int_normals[i * 3 + 2]) * theta_scale_for_decode(int_phi) - PI;

        let n2 = [
            phi.sin() * theta.cos(),
            phi.sin() * theta.sin(),
            phi.cos(),
        ];
        let basis = normal_basis(&smooth, i * 3);
        for j in 0..3 {
            let n = f64::from(basis[j]) * n2[0]
                + f64::from(basis[3 + j]) * n2[1]
                + f64::from(basis[6 + j]) * n2[2];
            normals[i * 3 + j] = (n * f64::from(magnitude)) as f32;
        }
    }
    normals
}

/// Fixed-point UV deltas against the previous sorted vertex.
pub(crate) fn make_uv_deltas(
    values: &[f32],
    precision: f32,
    sorted: &[SortableVertex],
) -> Vec<i32> {
    let scale = 1.0 / precision;
    let mut prev = [0i32; UV_ELEMENTS];

    let mut out = Vec::with_capacity(sorted.len() * UV_ELEMENTS);
    for sv in sorted {
        let old = sv.original_index * UV_ELEMENTS;
        for (j, p) in prev.iter_mut().enumerate() {
            let v = quantize(scale * values[old + j]);
            out.push(v - *p);
            *p = v;
        }
    }
    out
}

/// Reverse the UV deltas back to floating point.
pub(crate) fn restore_uv_coords(int_coords: &[i32], precision: f32) -> Vec<f32> {
    restore_deltas::<UV_ELEMENTS>(int_coords, precision)
}

/// Fixed-point attribute deltas against the previous sorted vertex.
pub(crate) fn make_attribute_deltas(
    values: &[f32],
    precision: f32,
    sorted: &[SortableVertex],
) -> Vec<i32> {
    let scale = 1.0 / precision;
    let mut prev = [0i32; ATTRIBUTE_ELEMENTS];

    let mut out = Vec::with_capacity(sorted.len() * ATTRIBUTE_ELEMENTS);
    for sv in sorted {
        let old = sv.original_index * ATTRIBUTE_ELEMENTS;
        for (j, p) in prev.iter_mut().enumerate() {
            let v = quantize(scale * values[old + j]);
            out.push(v - *p);
            *p = v;
        }
    }
    out
}

/// Reverse the attribute deltas back to floating point.
pub(crate) fn restore_attributes(int_attribs: &[i32], precision: f32) -> Vec<f32> {
    restore_deltas::<ATTRIBUTE_ELEMENTS>(int_attribs, precision)
}

fn restore_deltas<const N: usize>(ints: &[i32], precision: f32) -> Vec<f32> {
    let mut prev = [0i32; N];
    let mut out = Vec::with_capacity(ints.len());
    for tuple in ints.chunks_exact(N) {
        for (j, p) in prev.iter_mut().enumerate() {
            let v = tuple[j] + *p;
            out.push(v as f32 * precision);
            *p = v;
        }
    }
    out
}

/// Round to the nearest integer, half away from zero on the positive
/// side, exactly as the reference arithmetic does.
fn quantize(v: f32) -> i32 {
    (v + 0.5).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::setup_grid;

    fn cube_vertices() -> Vec<f32> {
        let mut v = Vec::new();
        for z in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for x in [0.0, 1.0] {
                    v.extend_from_slice(&[x, y, z]);
                }
            }
        }
        v
    }

    #[test]
    fn test_sort_is_by_cell_then_x() {
        let vertices = cube_vertices();
        let grid = setup_grid(&vertices);
        let sorted = sort_vertices(&grid, &vertices);

        for pair in sorted.windows(2) {
            assert!(
                pair[0].grid_index < pair[1].grid_index
                    || (pair[0].grid_index == pair[1].grid_index && pair[0].x <= pair[1].x)
            );
        }
    }

    #[test]
    fn test_reindex_round_trips_topology() {
        let vertices = cube_vertices();
        let grid = setup_grid(&vertices);
        let sorted = sort_vertices(&grid, &vertices);
        let indices = vec![0, 1, 2, 4, 5, 6];
        let reindexed = reindex_indices(&sorted, &indices);

        // Every reindexed entry must refer to the same position.
        for (&old, &new) in indices.iter().zip(&reindexed) {
            let o = old as usize * 3;
            let s = sorted[new as usize].original_index * 3;
            assert_eq!(&vertices[o..o + 3], &vertices[s..s + 3]);
        }
    }

    #[test]
    fn test_vertex_quantization_round_trip() {
        let vertices = cube_vertices();
        let grid = setup_grid(&vertices);
        let sorted = sort_vertices(&grid, &vertices);
        let precision = STANDARD_VERTEX_PRECISION;

        let deltas = make_vertex_deltas(&vertices, &sorted, &grid, precision);
        let mut grid_indices = grid_index_deltas(&sorted);
        for i in 1..grid_indices.len() {
            grid_indices[i] += grid_indices[i - 1];
        }
        let restored = restore_vertices(&deltas, &grid_indices, &grid, precision);

        for (i, sv) in sorted.iter().enumerate() {
            let old = sv.original_index * 3;
            for j in 0..3 {
                let err = (restored[i * 3 + j] - vertices[old + j]).abs();
                assert!(err <= precision / 2.0 + 1e-6, "component error {err}");
            }
        }
    }

    #[test]
    fn test_normal_round_trip() {
        // A pyramid with distinct face orientations.
        let vertices = vec![
            -1.0, -1.0, 0.0, //
            1.0, -1.0, 0.0, //
            1.0, 1.0, 0.0, //
            -1.0, 1.0, 0.0, //
            0.0, 0.0, 1.5,
        ];
        let indices = vec![0, 1, 4, 1, 2, 4, 2, 3, 4, 3, 0, 4];
        let normals = calc_smooth_normals(&vertices, &indices);

        let grid = setup_grid(&vertices);
        let sorted = sort_vertices(&grid, &vertices);
        let sorted_indices = {
            let mut idx = reindex_indices(&sorted, &indices);
            crate::indices::rearrange_triangles(&mut idx);
            idx
        };

        // Restored positions stand in for the decoder's view.
        let precision = STANDARD_VERTEX_PRECISION;
        let deltas = make_vertex_deltas(&vertices, &sorted, &grid, precision);
        let mut grid_indices = grid_index_deltas(&sorted);
        for i in 1..grid_indices.len() {
            grid_indices[i] += grid_indices[i - 1];
        }
        let restored = restore_vertices(&deltas, &grid_indices, &grid, precision);

        let normal_precision = STANDARD_NORMAL_PRECISION;
        let ints = make_normal_deltas(
            &restored,
            &normals,
            &sorted_indices,
            &sorted,
            normal_precision,
        );
        let out = restore_normals(&ints, &restored, &sorted_indices, normal_precision);

        for (i, sv) in sorted.iter().enumerate() {
            let old = sv.original_index * 3;
            let dot = out[i * 3] * normals[old]
                + out[i * 3 + 1] * normals[old + 1]
                + out[i * 3 + 2] * normals[old + 2];
            // Unit inputs: the angular error stays within the
            // precision band.
            assert!(dot > 1.0 - 2.0 * normal_precision, "dot {dot} at {i}");
        }
    }

    #[test]
    fn test_uv_delta_round_trip() {
        let grid = setup_grid(&cube_vertices());
        let vertices = cube_vertices();
        let sorted = sort_vertices(&grid, &vertices);
        let precision = 1.0 / 4096.0;

        let uv: Vec<f32> = (0..16).map(|i| i as f32 * 0.0625).collect();
        let deltas = make_uv_deltas(&uv, precision, &sorted);
        let restored = restore_uv_coords(&deltas, precision);

        for (i, sv) in sorted.iter().enumerate() {
            let old = sv.original_index * 2;
            for j in 0..2 {
                let err = (restored[i * 2 + j] - uv[old + j]).abs();
                assert!(err <= precision / 2.0 + 1e-6);
            }
        }
    }

    #[test]
    fn test_attribute_delta_round_trip() {
        let vertices = cube_vertices();
        let grid = setup_grid(&vertices);
        let sorted = sort_vertices(&grid, &vertices);
        let precision = 1.0 / 256.0;

        let values: Vec<f32> = (0..32).map(|i| (i % 7) as f32 * 0.125).collect();
        let deltas = make_attribute_deltas(&values, precision, &sorted);
        let restored = restore_attributes(&deltas, precision);

        for (i, sv) in sorted.iter().enumerate() {
            let old = sv.original_index * 4;
            for j in 0..4 {
                let err = (restored[i * 4 + j] - values[old + j]).abs();
                assert!(err <= precision / 2.0 + 1e-6);
            }
        }
    }
}
