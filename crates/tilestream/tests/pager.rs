//! End-to-end scheduler tests: encoded CTM tiles in 3MXB containers,
//! staged through both backends, observed through a recording sink.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use glam::{Vec3, Vec4};
use tilestream::{
    CamState, Fetcher, Manifest, MemoryFetcher, NodeEntry, Pager, PagerConfig, Plane,
    RenderPayload, RenderSink, ResourceEntry, ResourceFormat, ResourceKind, Result, Status,
    TileId, TilePackage,
};

/// A camera that sees everything; `w` controls the screen-diameter
/// estimate (`diameter = radius / w`), so small values force
/// refinement and large ones keep tiles coarse.
fn cam_with_pixel_w(w: f32) -> CamState {
    let everything_inside = Plane {
        normal: Vec3::X,
        d: 1e9,
    };
    CamState {
        planes: [everything_inside; 6],
        pixel_size_vector: Vec4::new(0.0, 0.0, 0.0, w),
        position: Vec3::new(0.0, 0.0, 5.0),
    }
}

fn refine_cam() -> CamState {
    cam_with_pixel_w(0.001)
}

fn coarse_cam() -> CamState {
    cam_with_pixel_w(1.0)
}

fn cull_cam() -> CamState {
    let everything_outside = Plane {
        normal: Vec3::X,
        d: -1e9,
    };
    CamState {
        planes: [everything_outside; 6],
        pixel_size_vector: Vec4::new(0.0, 0.0, 0.0, 1.0),
        position: Vec3::ZERO,
    }
}

fn cube_ctm() -> Vec<u8> {
    let mut vertices = Vec::new();
    for z in [0.0f32, 1.0] {
        for y in [0.0f32, 1.0] {
            for x in [0.0f32, 1.0] {
                vertices.extend_from_slice(&[x, y, z]);
            }
        }
    }
    let indices = vec![
        0, 2, 1, 1, 2, 3, 4, 5, 6, 5, 7, 6, 0, 1, 4, 1, 5, 4, 2, 6, 3, 3, 6, 7, 0, 4, 2, 2, 4,
        6, 1, 3, 5, 3, 7, 5,
    ];
    let mesh = openctm::Mesh {
        vertices,
        normals: None,
        indices,
        uv_maps: Vec::new(),
        attributes: Vec::new(),
    };
    openctm::write_mesh_mg2(
        &mesh,
        openctm::Mg2Params::default(),
        "",
        openctm::CompressionLevel::DEFAULT,
    )
    .unwrap()
}

fn geometry_resource(id: &str) -> ResourceEntry {
    ResourceEntry {
        id: id.to_string(),
        kind: ResourceKind::GeometryBuffer,
        format: ResourceFormat::Ctm,
        size: 0,
        bb_min: Some([0.0; 3]),
        bb_max: Some([1.0; 3]),
        texture: None,
    }
}

fn node_entry(id: &str, children: Vec<String>, resources: Vec<String>) -> NodeEntry {
    NodeEntry {
        id: id.to_string(),
        bb_min: [0.0; 3],
        bb_max: [1.0; 3],
        max_screen_diameter: 50.0,
        children,
        resources,
    }
}

fn leaf_container(node_id: &str) -> Vec<u8> {
    let manifest = Manifest {
        version: 1,
        nodes: vec![node_entry(node_id, Vec::new(), vec!["geom".to_string()])],
        resources: vec![geometry_resource("geom")],
    };
    TilePackage::build(&manifest, &[cube_ctm()])
}

/// One root tile with one child container holding two leaves.
fn two_level_scene() -> MemoryFetcher {
    let child_manifest = Manifest {
        version: 1,
        nodes: vec![
            node_entry("leaf0", Vec::new(), vec!["geom".to_string()]),
            node_entry("leaf1", Vec::new(), vec!["geom".to_string()]),
        ],
        resources: vec![geometry_resource("geom")],
    };
    let child = TilePackage::build(&child_manifest, &[cube_ctm()]);

    let root_manifest = Manifest {
        version: 1,
        nodes: vec![node_entry(
            "root",
            vec!["sub/child.3mxb".to_string()],
            vec!["geom".to_string()],
        )],
        resources: vec![geometry_resource("geom")],
    };
    let root = TilePackage::build(&root_manifest, &[cube_ctm()]);

    let mut fetcher = MemoryFetcher::new();
    fetcher.insert("Data/root.3mxb", root);
    fetcher.insert("Data/sub/child.3mxb", child);
    fetcher
}

#[derive(Default)]
struct RecordingSink {
    created: Vec<(usize, String, usize)>,
    destroyed: Vec<usize>,
    visible: std::collections::HashMap<usize, bool>,
}

impl RenderSink for RecordingSink {
    fn create_tile(&mut self, id: TileId, node_id: &str, payloads: &[RenderPayload]) {
        let vertex_count = payloads
            .iter()
            .map(|p| match p {
                RenderPayload::TexturedMesh { mesh, .. } => mesh.vertex_count(),
                RenderPayload::PointCloud(cloud) => cloud.positions.len() / 3,
            })
            .sum();
        self.created.push((id.index(), node_id.to_string(), vertex_count));
        self.visible.insert(id.index(), false);
    }

    fn set_visible(&mut self, id: TileId, visible: bool) {
        self.visible.insert(id.index(), visible);
    }

    fn destroy_tile(&mut self, id: TileId) {
        self.destroyed.push(id.index());
        self.visible.remove(&id.index());
    }
}

fn inline_config() -> PagerConfig {
    PagerConfig {
        workers: 0,
        ..PagerConfig::default()
    }
}

#[test]
fn test_open_creates_root_tiles() {
    let fetcher = Arc::new(two_level_scene());
    let mut sink = RecordingSink::default();
    let pager = Pager::open(fetcher, "Data/root.3mxb", inline_config(), &mut sink).unwrap();

    assert_eq!(pager.roots().len(), 1);
    assert_eq!(sink.created.len(), 1);
    let (_, node_id, vertex_count) = &sink.created[0];
    assert_eq!(node_id, "root");
    // The MG2-encoded cube survived the trip.
    assert_eq!(*vertex_count, 8);
}

#[test]
fn test_refinement_stages_commits_and_shows_children() {
    let fetcher = Arc::new(two_level_scene());
    let mut sink = RecordingSink::default();
    let mut pager =
        Pager::open(fetcher, "Data/root.3mxb", inline_config(), &mut sink).unwrap();
    let root = pager.roots()[0];
    let cams = [refine_cam()];

    // Frame 1: the root wants refinement; the inline backend stages
    // its children within the frame.
    pager.update(1, &cams, &mut sink);
    assert_eq!(pager.arena().get(root).status, Status::Staged);
    // Until children commit, the coarse root stays visible.
    assert_eq!(sink.visible[&root.index()], true);

    // Frame 2: commit and descend.
    pager.update(2, &cams, &mut sink);
    assert_eq!(pager.arena().get(root).status, Status::Committed);
    let stats = pager.stats();
    assert_eq!(stats.committed, 1);
    assert_eq!(stats.resident, 3);

    // The two leaves were created and are now the visible level.
    assert_eq!(sink.created.len(), 3);
    assert_eq!(sink.visible[&root.index()], false);
    for child in &pager.arena().get(root).committed_children {
        assert_eq!(sink.visible[&child.index()], true);
    }
}

#[test]
fn test_zoom_out_keeps_children_until_eviction() {
    let fetcher = Arc::new(two_level_scene());
    let mut sink = RecordingSink::default();
    let config = PagerConfig {
        workers: 0,
        max_resident_tiles: 0,
        eviction_headroom: 0.0,
        ..PagerConfig::default()
    };
    let mut pager = Pager::open(fetcher, "Data/root.3mxb", config, &mut sink).unwrap();
    let root = pager.roots()[0];

    pager.update(1, &[refine_cam()], &mut sink);
    pager.update(2, &[refine_cam()], &mut sink);
    assert_eq!(pager.stats().committed, 1);
    assert!(sink.destroyed.is_empty());

    // Zooming out makes the root coarse again; its children are only
    // reclaimed by the LRU pass, which needs a frame where the root
    // went unused.
    pager.update(3, &[coarse_cam()], &mut sink);
    assert_eq!(pager.arena().get(root).status, Status::Unstaged);
    assert_eq!(pager.stats().resident, 1);
    assert_eq!(sink.destroyed.len(), 2);
    assert_eq!(sink.visible[&root.index()], true);
}

#[test]
fn test_culled_root_is_hidden_and_not_staged() {
    let fetcher = Arc::new(two_level_scene());
    let mut sink = RecordingSink::default();
    let mut pager =
        Pager::open(fetcher, "Data/root.3mxb", inline_config(), &mut sink).unwrap();
    let root = pager.roots()[0];

    pager.update(1, &[cull_cam()], &mut sink);
    assert_eq!(sink.visible[&root.index()], false);
    assert_eq!(pager.arena().get(root).status, Status::Unstaged);
    assert_eq!(pager.stats().in_flight, 0);
}

#[test]
fn test_failed_tile_stays_coarse_and_retries() {
    // The root references a child container that does not exist.
    let root_manifest = Manifest {
        version: 1,
        nodes: vec![node_entry(
            "root",
            vec!["missing/child.3mxb".to_string()],
            vec!["geom".to_string()],
        )],
        resources: vec![geometry_resource("geom")],
    };
    let root = TilePackage::build(&root_manifest, &[cube_ctm()]);
    let mut fetcher = MemoryFetcher::new();
    fetcher.insert("root.3mxb", root);

    let mut sink = RecordingSink::default();
    let mut pager = Pager::open(
        Arc::new(fetcher),
        "root.3mxb",
        inline_config(),
        &mut sink,
    )
    .unwrap();
    let root = pager.roots()[0];
    let cams = [refine_cam()];

    for frame in 1..=4 {
        pager.update(frame, &cams, &mut sink);
        // The failure never leaves the tile boundary: the root just
        // returns to Unstaged and stays renderable at its coarse level.
        assert_eq!(pager.arena().get(root).status, Status::Unstaged);
        assert_eq!(sink.visible[&root.index()], true);
    }
    assert_eq!(pager.stats().committed, 0);
}

/// A fetcher whose reads block until the gate opens, to hold staging
/// batches in flight.
struct GatedFetcher {
    inner: MemoryFetcher,
    gate: Arc<(Mutex<bool>, Condvar)>,
}

impl Fetcher for GatedFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let (lock, condvar) = &*self.gate;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = condvar.wait(open).unwrap();
        }
        drop(open);
        self.inner.fetch(path)
    }
}

#[test]
fn test_admission_caps_concurrent_staging() {
    // Four refinable roots, a concurrency cap of two.
    let mut root_nodes = Vec::new();
    let mut fetcher = MemoryFetcher::new();
    for i in 0..4 {
        let child_file = format!("child{i}.3mxb");
        fetcher.insert(child_file.clone(), leaf_container(&format!("leaf{i}")));
        root_nodes.push(node_entry(
            &format!("root{i}"),
            vec![child_file],
            vec!["geom".to_string()],
        ));
    }
    let root_manifest = Manifest {
        version: 1,
        nodes: root_nodes,
        resources: vec![geometry_resource("geom")],
    };
    fetcher.insert(
        "root.3mxb",
        TilePackage::build(&root_manifest, &[cube_ctm()]),
    );

    let gate = Arc::new((Mutex::new(true), Condvar::new()));
    let gated = GatedFetcher {
        inner: fetcher,
        gate: Arc::clone(&gate),
    };

    let config = PagerConfig {
        workers: 4,
        max_concurrent_requests: 2,
        ..PagerConfig::default()
    };
    let mut sink = RecordingSink::default();
    let mut pager = Pager::open(Arc::new(gated), "root.3mxb", config, &mut sink).unwrap();

    // Close the gate so dispatched batches stay in flight.
    *gate.0.lock().unwrap() = false;

    let cams = [refine_cam()];
    pager.update(1, &cams, &mut sink);
    let stats = pager.stats();
    assert_eq!(stats.staging, 2, "at most the cap may be staging");
    assert_eq!(stats.in_flight, 2);

    // Re-traversing while saturated must not admit more.
    pager.update(2, &cams, &mut sink);
    assert_eq!(pager.stats().staging, 2);

    // Open the gate; the deferred tiles get their turn and everything
    // eventually commits.
    {
        let (lock, condvar) = &*gate;
        *lock.lock().unwrap() = true;
        condvar.notify_all();
    }
    let mut all_committed = false;
    for frame in 3..=200 {
        pager.update(frame, &cams, &mut sink);
        if pager.stats().committed == 4 {
            all_committed = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(all_committed, "deferred tiles never staged");
    pager.shutdown();
}

#[test]
fn test_worker_pool_stages_to_completion() {
    let fetcher = Arc::new(two_level_scene());
    let mut sink = RecordingSink::default();
    let config = PagerConfig {
        workers: 2,
        ..PagerConfig::default()
    };
    let mut pager = Pager::open(fetcher, "Data/root.3mxb", config, &mut sink).unwrap();
    let cams = [refine_cam()];

    let mut committed = false;
    for frame in 1..=100 {
        pager.update(frame, &cams, &mut sink);
        if pager.stats().committed == 1 {
            committed = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(committed, "staging never completed");
    assert_eq!(pager.stats().resident, 3);
    pager.shutdown();
}
