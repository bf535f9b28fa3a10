//! The JSON tile manifest carried inside each 3MXB container, plus the
//! top-level `.3mx` scene description.

use serde::{Deserialize, Serialize};

/// The header manifest of a 3MXB tile container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Manifest format version.
    pub version: u32,
    /// Tile nodes declared by this container.
    pub nodes: Vec<NodeEntry>,
    /// Resource buffers appended after the header, in order.
    pub resources: Vec<ResourceEntry>,
}

/// One tile node in a manifest.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeEntry {
    /// Node identifier, unique within the container.
    pub id: String,
    /// Minimum corner of the node's bounding box.
    #[serde(rename = "bbMin")]
    pub bb_min: [f32; 3],
    /// Maximum corner of the node's bounding box.
    #[serde(rename = "bbMax")]
    pub bb_max: [f32; 3],
    /// Projected screen diameter above which the node's children should
    /// replace it.
    #[serde(rename = "maxScreenDiameter")]
    pub max_screen_diameter: f32,
    /// Relative paths of the child containers to stage when refining.
    pub children: Vec<String>,
    /// Resource ids (from the same container) rendered for this node.
    pub resources: Vec<String>,
}

/// Category of a resource buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ResourceKind {
    /// A texture image.
    #[serde(rename = "textureBuffer")]
    TextureBuffer,
    /// Mesh or point geometry.
    #[serde(rename = "geometryBuffer")]
    GeometryBuffer,
    /// Anything this consumer does not understand; skipped with a
    /// warning rather than failing the tile.
    #[serde(other)]
    Unknown,
}

/// Payload encoding of a resource buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ResourceFormat {
    /// JPEG image data.
    #[serde(rename = "jpg")]
    Jpg,
    /// A CTM mesh file.
    #[serde(rename = "ctm")]
    Ctm,
    /// Raw point cloud (count, positions, colors).
    #[serde(rename = "xyz")]
    Xyz,
    /// Anything this consumer does not understand.
    #[serde(other)]
    Unknown,
}

/// One resource buffer in a manifest.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceEntry {
    /// Resource identifier, referenced by node entries.
    pub id: String,
    /// Buffer category.
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Payload encoding.
    pub format: ResourceFormat,
    /// Byte length of the buffer following the header.
    #[serde(default)]
    pub size: usize,
    /// Minimum corner of the geometry's bounding box, when present.
    #[serde(rename = "bbMin", default)]
    pub bb_min: Option<[f32; 3]>,
    /// Maximum corner of the geometry's bounding box, when present.
    #[serde(rename = "bbMax", default)]
    pub bb_max: Option<[f32; 3]>,
    /// Id of the texture resource a geometry buffer is mapped with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
}

/// The top-level `.3mx` scene description.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scene {
    /// Scene name.
    pub name: String,
    /// Layers composing the scene.
    pub layers: Vec<Layer>,
}

/// One layer of a `.3mx` scene, pointing at its root container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Layer {
    /// Layer name.
    pub name: String,
    /// Layer identifier.
    pub id: String,
    /// Relative path of the layer's root 3MXB container.
    pub root: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_field_mapping() {
        let json = r#"{
            "version": 1,
            "nodes": [{
                "id": "node0",
                "bbMin": [-1.0, -2.0, 0.0],
                "bbMax": [1.0, 2.0, 3.0],
                "maxScreenDiameter": 120.0,
                "children": ["sub/child.3mxb"],
                "resources": ["geom0"]
            }],
            "resources": [{
                "id": "geom0",
                "type": "geometryBuffer",
                "format": "ctm",
                "size": 1234,
                "bbMin": [-1.0, -2.0, 0.0],
                "bbMax": [1.0, 2.0, 3.0],
                "texture": "tex0"
            }, {
                "id": "tex0",
                "type": "textureBuffer",
                "format": "jpg",
                "size": 99
            }]
        }"#;

        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.version, 1);
        assert_eq!(manifest.nodes.len(), 1);

        let node = &manifest.nodes[0];
        assert_eq!(node.id, "node0");
        assert_eq!(node.bb_min, [-1.0, -2.0, 0.0]);
        assert_eq!(node.max_screen_diameter, 120.0);
        assert_eq!(node.children, vec!["sub/child.3mxb"]);

        let geom = &manifest.resources[0];
        assert_eq!(geom.kind, ResourceKind::GeometryBuffer);
        assert_eq!(geom.format, ResourceFormat::Ctm);
        assert_eq!(geom.size, 1234);
        assert_eq!(geom.texture.as_deref(), Some("tex0"));

        let tex = &manifest.resources[1];
        assert_eq!(tex.kind, ResourceKind::TextureBuffer);
        assert_eq!(tex.format, ResourceFormat::Jpg);
        assert!(tex.texture.is_none());
    }

    #[test]
    fn test_unknown_kinds_do_not_fail_the_manifest() {
        let json = r#"{
            "version": 1,
            "nodes": [],
            "resources": [{
                "id": "r0",
                "type": "futureBuffer",
                "format": "dds",
                "size": 10
            }]
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.resources[0].kind, ResourceKind::Unknown);
        assert_eq!(manifest.resources[0].format, ResourceFormat::Unknown);
    }

    #[test]
    fn test_scene_round_trip() {
        let json = r#"{
            "name": "city",
            "layers": [{
                "name": "mesh",
                "id": "layer0",
                "root": "Data/root.3mxb"
            }]
        }"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.layers[0].root, "Data/root.3mxb");
    }
}
