//! The in-memory mesh representation.

use crate::error::IntegrityError;

/// Components per vertex position.
pub const POSITION_ELEMENTS: usize = 3;
/// Components per vertex normal.
pub const NORMAL_ELEMENTS: usize = 3;
/// Components per UV coordinate.
pub const UV_ELEMENTS: usize = 2;
/// Components per generic vertex attribute.
pub const ATTRIBUTE_ELEMENTS: usize = 4;

/// A named per-vertex attribute map (UV coordinates or generic values).
///
/// Equality is by deep value comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeData {
    /// Unique name of the map.
    pub name: String,
    /// Material file reference (used only for UV maps).
    pub material_name: Option<String>,
    /// Quantization step used by the MG2 codec; must be positive.
    pub precision: f32,
    /// The per-vertex values, `UV_ELEMENTS` or `ATTRIBUTE_ELEMENTS` per
    /// vertex.
    pub values: Vec<f32>,
}

impl AttributeData {
    /// Customary precision for UV coordinate maps.
    pub const STANDARD_UV_PRECISION: f32 = 1.0 / 4096.0;
    /// Customary precision for generic attribute maps.
    pub const STANDARD_PRECISION: f32 = 1.0 / 256.0;
}

/// A triangle mesh as decoded from (or about to be encoded into) a CTM
/// stream.
///
/// Constructed once and immutable afterwards; the encoder copies before
/// reordering triangles and never mutates its input.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex positions, three components per vertex.
    pub vertices: Vec<f32>,
    /// Optional vertex normals, three components per vertex.
    pub normals: Option<Vec<f32>>,
    /// Triangle indices, three per triangle, each below the vertex count.
    pub indices: Vec<u32>,
    /// UV coordinate maps, two components per vertex.
    pub uv_maps: Vec<AttributeData>,
    /// Generic attribute maps, four components per vertex.
    pub attributes: Vec<AttributeData>,
}

impl Mesh {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / POSITION_ELEMENTS
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of UV coordinate maps.
    #[must_use]
    pub fn uv_map_count(&self) -> usize {
        self.uv_maps.len()
    }

    /// Number of generic attribute maps.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the mesh carries vertex normals.
    #[must_use]
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Average edge length over all triangles.
    ///
    /// Sums half-edges, so in a solid mesh every connected edge is
    /// counted twice; the average is unaffected.
    #[must_use]
    pub fn average_edge_length(&self) -> f32 {
        let mut total = 0.0f32;
        let mut edges = 0u32;
        for tri in self.indices.chunks_exact(3) {
            let mut p1 = tri[2] as usize * 3;
            for &idx in tri {
                let p2 = idx as usize * 3;
                let dx = self.vertices[p2] - self.vertices[p1];
                let dy = self.vertices[p2 + 1] - self.vertices[p1 + 1];
                let dz = self.vertices[p2 + 2] - self.vertices[p1 + 2];
                total += (dx * dx + dy * dy + dz * dz).sqrt();
                p1 = p2;
                edges += 1;
            }
        }
        if edges == 0 { 0.0 } else { total / edges as f32 }
    }

    /// Validate the mesh invariants.
    ///
    /// Checks, in order: mandatory non-empty vertex and triangle data,
    /// index array length a multiple of three, all indices in range,
    /// all values finite, all precisions positive. Runs over fully
    /// constructed arrays only; decoders call this after the last array
    /// is built so a rejected mesh is still complete for diagnostics.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        if self.vertices.is_empty() || self.triangle_count() < 1 {
            return Err(IntegrityError::Empty);
        }
        if self.indices.len() % 3 != 0 {
            return Err(IntegrityError::IndexCount {
                len: self.indices.len(),
            });
        }

        let vertex_count = self.vertex_count();
        for &index in &self.indices {
            if index as usize >= vertex_count {
                return Err(IntegrityError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }

        if self.vertices.iter().any(|v| !v.is_finite()) {
            return Err(IntegrityError::NotFinite { context: "vertex" });
        }
        if let Some(normals) = &self.normals
            && normals.iter().any(|v| !v.is_finite())
        {
            return Err(IntegrityError::NotFinite { context: "normal" });
        }
        for map in &self.uv_maps {
            if map.values.iter().any(|v| !v.is_finite()) {
                return Err(IntegrityError::NotFinite { context: "texcoord" });
            }
            if map.precision <= 0.0 {
                return Err(IntegrityError::BadPrecision {
                    value: map.precision,
                });
            }
        }
        for map in &self.attributes {
            if map.values.iter().any(|v| !v.is_finite()) {
                return Err(IntegrityError::NotFinite {
                    context: "attribute",
                });
            }
            if map.precision <= 0.0 {
                return Err(IntegrityError::BadPrecision {
                    value: map.precision,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> Mesh {
        Mesh {
            vertices: vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0,
            ],
            normals: None,
            indices: vec![0, 1, 2, 0, 2, 3],
            uv_maps: Vec::new(),
            attributes: Vec::new(),
        }
    }

    #[test]
    fn test_counts() {
        let m = unit_quad();
        assert_eq!(m.vertex_count(), 4);
        assert_eq!(m.triangle_count(), 2);
        assert!(!m.has_normals());
    }

    #[test]
    fn test_integrity_ok() {
        unit_quad().check_integrity().unwrap();
    }

    #[test]
    fn test_integrity_rejects_nan_vertex() {
        let mut m = unit_quad();
        m.vertices[4] = f32::NAN;
        assert_eq!(
            m.check_integrity(),
            Err(IntegrityError::NotFinite { context: "vertex" })
        );
    }

    #[test]
    fn test_integrity_rejects_out_of_range_index() {
        let mut m = unit_quad();
        // Equal to the vertex count is already out of range.
        m.indices[5] = 4;
        assert_eq!(
            m.check_integrity(),
            Err(IntegrityError::IndexOutOfRange {
                index: 4,
                vertex_count: 4
            })
        );
    }

    #[test]
    fn test_integrity_rejects_partial_triangle() {
        let mut m = unit_quad();
        m.indices.pop();
        assert_eq!(
            m.check_integrity(),
            Err(IntegrityError::IndexCount { len: 5 })
        );
    }

    #[test]
    fn test_integrity_rejects_empty() {
        let m = Mesh {
            vertices: Vec::new(),
            normals: None,
            indices: Vec::new(),
            uv_maps: Vec::new(),
            attributes: Vec::new(),
        };
        assert_eq!(m.check_integrity(), Err(IntegrityError::Empty));
    }

    #[test]
    fn test_integrity_rejects_bad_precision() {
        let mut m = unit_quad();
        m.uv_maps.push(AttributeData {
            name: "uv".to_string(),
            material_name: None,
            precision: 0.0,
            values: vec![0.0; 8],
        });
        assert_eq!(
            m.check_integrity(),
            Err(IntegrityError::BadPrecision { value: 0.0 })
        );
    }

    #[test]
    fn test_average_edge_length() {
        let m = unit_quad();
        // Half-edge walk over both triangles: 2 unit edges + 1 diagonal
        // each, the shared diagonal counted once per triangle.
        let expected = (4.0 + 2.0 * std::f32::consts::SQRT_2) / 6.0;
        assert!((m.average_edge_length() - expected).abs() < 1e-6);
    }
}
