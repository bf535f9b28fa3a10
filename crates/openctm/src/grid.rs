//! The 3D space subdivision grid used by the MG2 codec.

use crate::error::FormatError;
use crate::io::{Reader, Writer};

/// An axis-aligned box subdivided into a regular cell grid.
///
/// Scoped to a single MG2 encode or decode call; vertex positions are
/// quantized relative to the origin of their containing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    min: [f32; 3],
    max: [f32; 3],
    division: [i32; 3],
}

impl Grid {
    /// Construct a grid from its bounds and per-axis division counts.
    #[must_use]
    pub fn new(min: [f32; 3], max: [f32; 3], division: [i32; 3]) -> Self {
        Self { min, max, division }
    }

    /// Read a grid from a stream (3 × f32 min, 3 × f32 max, 3 × i32
    /// division).
    pub fn from_reader(r: &mut Reader<'_>) -> Result<Self, FormatError> {
        let min = r.read_f32_array(3, "grid min")?;
        let max = r.read_f32_array(3, "grid max")?;
        let division = r.read_i32_array(3, "grid division")?;
        Ok(Self {
            min: [min[0], min[1], min[2]],
            max: [max[0], max[1], max[2]],
            division: [division[0], division[1], division[2]],
        })
    }

    /// Write the grid in stream order.
    pub fn write_to(&self, w: &mut Writer) {
        w.write_f32_array(&self.min);
        w.write_f32_array(&self.max);
        w.write_i32_array(&self.division);
    }

    /// Whether the grid satisfies its invariants: at least one division
    /// per axis and `max >= min` per axis.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.division.iter().all(|&d| d >= 1)
            && (0..3).all(|i| self.max[i] >= self.min[i])
    }

    /// Lower bounds per axis.
    #[must_use]
    pub fn min(&self) -> &[f32; 3] {
        &self.min
    }

    /// Upper bounds per axis.
    #[must_use]
    pub fn max(&self) -> &[f32; 3] {
        &self.max
    }

    /// Division counts per axis.
    #[must_use]
    pub fn division(&self) -> &[i32; 3] {
        &self.division
    }

    /// Cell size per axis: `(max - min) / division`.
    #[must_use]
    pub fn cell_size(&self) -> [f32; 3] {
        let mut size = [0.0; 3];
        for i in 0..3 {
            size[i] = (self.max[i] - self.min[i]) / self.division[i] as f32;
        }
        size
    }

    /// Flattened index of the cell containing `point`.
    ///
    /// Each axis is clamped to the last cell so points on the maximum
    /// boundary (or nudged past it by float rounding) stay in range.
    #[must_use]
    pub fn point_to_cell(&self, point: [f32; 3]) -> i32 {
        let size = self.cell_size();
        let mut idx = [0i32; 3];
        for i in 0..3 {
            idx[i] = ((point[i] - self.min[i]) / size[i]).floor() as i32;
            if idx[i] >= self.division[i] {
                idx[i] = self.division[i] - 1;
            }
        }
        idx[0] + self.division[0] * (idx[1] + self.division[1] * idx[2])
    }

    /// Origin (minimum corner) of the cell with flattened index `idx`.
    #[must_use]
    pub fn cell_origin(&self, idx: i32) -> [f32; 3] {
        let ydiv = self.division[0];
        let zdiv = ydiv * self.division[1];

        let mut rest = idx;
        let z = rest / zdiv;
        rest -= z * zdiv;
        let y = rest / ydiv;
        rest -= y * ydiv;
        let x = rest;

        let size = self.cell_size();
        [
            x as f32 * size[0] + self.min[0],
            y as f32 * size[1] + self.min[1],
            z as f32 * size[2] + self.min[2],
        ]
    }
}

/// Choose a grid for the given vertex positions.
///
/// The resolution balances the per-axis extents against the vertex
/// count: each axis gets `ceil((100 * vc)^(1/3) * extent_fraction)`
/// divisions, at least one. A degenerate bounding box (extent sum below
/// 1e-30) falls back to a fixed 4×4×4 grid.
#[must_use]
pub fn setup_grid(vertices: &[f32]) -> Grid {
    let vc = vertices.len() / 3;

    let mut min = [vertices[0], vertices[1], vertices[2]];
    let mut max = min;
    for v in vertices.chunks_exact(3).skip(1) {
        for j in 0..3 {
            min[j] = min[j].min(v[j]);
            max[j] = max[j].max(v[j]);
        }
    }

    let mut factor = [0.0f32; 3];
    for i in 0..3 {
        factor[i] = max[i] - min[i];
    }
    let sum = factor[0] + factor[1] + factor[2];

    let mut division = [4i32; 3];
    if sum > 1e-30 {
        let inv = 1.0 / sum;
        let wanted = f64::from(100.0f32 * vc as f32).cbrt();
        for i in 0..3 {
            division[i] = (wanted * f64::from(factor[i] * inv)).ceil() as i32;
            if division[i] < 1 {
                division[i] = 1;
            }
        }
    }

    Grid::new(min, max, division)
}
