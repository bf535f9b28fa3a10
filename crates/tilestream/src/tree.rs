//! The paged-LOD tile tree and its per-frame traversal.
//!
//! Tiles live in an arena and carry only scheduling state (bounds,
//! thresholds, status, children); renderer-side resources belong to the
//! host, which observes the tree through [`RenderSink`] callbacks keyed
//! by [`TileId`].

use crate::culling::{BoundingSphere, CamState, Intersection, PlaneClipMask};
use crate::lru::LruCache;
use crate::queue::{Priority, RequestList, StageRequest};
use crate::stage::{RenderPayload, StagedChild};

/// Stable handle to a tile in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub(crate) usize);

impl TileId {
    /// The arena slot index, for host-side keying.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Staging lifecycle of a tile's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No children materialized and none in flight.
    Unstaged,
    /// A staging batch for the children is in flight.
    Staging,
    /// The children's data is fully parsed, awaiting commit.
    Staged,
    /// The children are live tiles in the tree.
    Committed,
}

/// Pure scheduling state of one tile.
#[derive(Debug)]
pub struct TileNode {
    /// Manifest id of the node.
    pub id: String,
    /// Directory context for resolving `children_files`.
    pub dir: String,
    /// Culling volume.
    pub bounding_sphere: BoundingSphere,
    /// Refinement threshold: children replace this tile once its
    /// projected diameter exceeds this many pixels.
    pub max_screen_diameter: f32,
    /// Relative paths of the child containers.
    pub children_files: Vec<String>,
    /// Live children, present only while `status == Committed`.
    pub committed_children: Vec<TileId>,
    /// Staging lifecycle state.
    pub status: Status,
    /// Parsed child data between Staged and Committed.
    pub(crate) staged: Option<Vec<StagedChild>>,
    /// Distance from the root (roots are depth 0).
    pub depth: usize,
    /// Frame counter value of the last traversal that visited this
    /// tile.
    pub last_traversal_frame: u64,
}

impl TileNode {
    pub(crate) fn from_staged(child: &StagedChild, depth: usize) -> (Self, Vec<RenderPayload>) {
        (
            Self {
                id: child.id.clone(),
                dir: child.dir.clone(),
                bounding_sphere: BoundingSphere::from_bounds(child.bb_min, child.bb_max),
                max_screen_diameter: child.max_screen_diameter,
                children_files: child.children_files.clone(),
                committed_children: Vec::new(),
                status: Status::Unstaged,
                staged: None,
                depth,
                last_traversal_frame: 0,
            },
            child.payloads.clone(),
        )
    }
}

/// Slab arena owning every tile node.
#[derive(Debug, Default)]
pub struct TileArena {
    slots: Vec<Option<TileNode>>,
    free: Vec<usize>,
}

impl TileArena {
    pub(crate) fn insert(&mut self, node: TileNode) -> TileId {
        if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(node);
            TileId(slot)
        } else {
            self.slots.push(Some(node));
            TileId(self.slots.len() - 1)
        }
    }

    pub(crate) fn remove(&mut self, id: TileId) {
        if self.slots[id.0].take().is_some() {
            self.free.push(id.0);
        }
    }

    /// Borrow a tile.
    ///
    /// # Panics
    ///
    /// Panics when the id refers to a removed tile; ids handed to hosts
    /// stay valid until `destroy_tile` reports otherwise.
    #[must_use]
    pub fn get(&self, id: TileId) -> &TileNode {
        self.slots[id.0].as_ref().expect("stale tile id")
    }

    pub(crate) fn get_mut(&mut self, id: TileId) -> &mut TileNode {
        self.slots[id.0].as_mut().expect("stale tile id")
    }

    /// Number of live tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether the arena holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over live tiles.
    pub fn iter(&self) -> impl Iterator<Item = (TileId, &TileNode)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (TileId(i), node)))
    }
}

/// Host-side renderer hooks.
///
/// The scheduler owns tile lifecycles and visibility decisions; the
/// host owns the actual render resources and reacts to these callbacks.
/// `create_tile` delivers a tile's payloads exactly once, before any
/// visibility call for it; created tiles start hidden.
pub trait RenderSink {
    /// A tile was committed; build its render resources.
    fn create_tile(&mut self, id: TileId, node_id: &str, payloads: &[RenderPayload]);

    /// Show or hide a tile's render resources.
    fn set_visible(&mut self, id: TileId, visible: bool);

    /// A tile was evicted; release its render resources.
    fn destroy_tile(&mut self, id: TileId);
}

/// Shared mutable context for one traversal pass.
pub(crate) struct Traversal<'a> {
    pub arena: &'a mut TileArena,
    pub lru: &'a mut LruCache,
    pub requests: &'a mut RequestList,
    pub sink: &'a mut dyn RenderSink,
    pub frame: u64,
    /// Commit slots left this frame (admission-controlled).
    pub commit_slots: usize,
}

impl Traversal<'_> {
    /// Visit one tile: cull, pick LOD, commit/recurse/request staging.
    ///
    /// Traversal only mutates scheduling state and enqueues requests;
    /// it never performs staging work itself.
    pub fn traverse(&mut self, id: TileId, cam_states: &[CamState]) {
        if cam_states.is_empty() {
            return;
        }
        self.arena.get_mut(id).last_traversal_frame = self.frame;

        // Cull against every camera; visibility is the union, screen
        // size the maximum, distance the minimum over cameras.
        let sphere = self.arena.get(id).bounding_sphere;
        let mut inside = false;
        let mut screen_diameter = 0.0f32;
        let mut min_distance = f32::MAX;
        for cam in cam_states {
            let mask = sphere.intersect_planes(&cam.planes, PlaneClipMask::all_planes());
            if mask.intersection() != Intersection::Outside {
                inside = true;
                screen_diameter =
                    screen_diameter.max(sphere.screen_diameter(cam.pixel_size_vector));
                min_distance = min_distance.min(sphere.distance_to(cam.position));
            }
        }

        if !inside {
            self.sink.set_visible(id, false);
            self.mark_staging_children(id);
            return;
        }

        let node = self.arena.get(id);
        if screen_diameter < node.max_screen_diameter || node.children_files.is_empty() {
            // Coarse enough (or a leaf): render this tile itself.
            self.sink.set_visible(id, true);
            self.mark_staging_children(id);
            return;
        }

        // The tile wants refinement.
        if self.arena.get(id).status == Status::Staged && self.commit_slots > 0 {
            self.commit_slots -= 1;
            self.commit(id);
        }

        match self.arena.get(id).status {
            Status::Committed => {
                self.sink.set_visible(id, false);
                self.lru.mark_used(id, self.frame);
                let children = self.arena.get(id).committed_children.clone();
                for child in children {
                    self.traverse(child, cam_states);
                }
            }
            Status::Unstaged => {
                self.sink.set_visible(id, true);
                let depth = self.arena.get(id).depth;
                // A full list defers the request; the tile stays
                // unstaged and becomes eligible again next frame.
                let _ = self.requests.push(StageRequest {
                    tile: id,
                    priority: Priority::new(depth, min_distance),
                });
            }
            Status::Staging | Status::Staged => {
                // Children on the way; keep rendering the coarse tile.
                self.sink.set_visible(id, true);
                self.lru.mark_used(id, self.frame);
            }
        }
    }

    /// Promote a staged tile: materialize its children as live tiles.
    fn commit(&mut self, id: TileId) {
        let Some(staged) = self.arena.get_mut(id).staged.take() else {
            return;
        };
        let depth = self.arena.get(id).depth;

        let mut children = Vec::with_capacity(staged.len());
        for child in &staged {
            let (node, payloads) = TileNode::from_staged(child, depth + 1);
            let child_id = self.arena.insert(node);
            self.sink.create_tile(child_id, &child.id, &payloads);
            children.push(child_id);
        }

        let node = self.arena.get_mut(id);
        node.committed_children = children;
        node.status = Status::Committed;
        self.lru.add(id, self.frame);

        tracing::debug!(
            "committed tile \"{}\" with {} children",
            self.arena.get(id).id,
            self.arena.get(id).committed_children.len()
        );
    }

    /// Walk a subtree that is no longer refining and account for any
    /// staging still in flight below it.
    ///
    /// Returns true when the subtree holds a tile in Staging; every
    /// committed ancestor of in-flight work is marked used so the LRU
    /// pass cannot evict it out from under the worker. A tile whose
    /// staged data was never committed drops that data and returns to
    /// Unstaged.
    fn mark_staging_children(&mut self, id: TileId) -> bool {
        match self.arena.get(id).status {
            Status::Unstaged => false,
            Status::Staging => {
                self.lru.mark_used(id, self.frame);
                true
            }
            Status::Staged => {
                let node = self.arena.get_mut(id);
                node.staged = None;
                node.status = Status::Unstaged;
                false
            }
            Status::Committed => {
                let children = self.arena.get(id).committed_children.clone();
                let mut has_staging = false;
                for child in children {
                    if self.arena.get(child).status == Status::Staging {
                        has_staging = true;
                    } else {
                        has_staging |= self.mark_staging_children(child);
                    }
                }
                if has_staging {
                    self.lru.mark_used(id, self.frame);
                }
                has_staging
            }
        }
    }
}

/// Destroy a tile's committed subtree and return it to Unstaged.
///
/// Used by the eviction pass; the pass never selects tiles with
/// in-flight staging below them, so everything here is safe to free.
pub(crate) fn unload_children(
    arena: &mut TileArena,
    lru: &mut LruCache,
    sink: &mut dyn RenderSink,
    id: TileId,
) {
    let children = std::mem::take(&mut arena.get_mut(id).committed_children);
    for child in children {
        destroy_subtree(arena, lru, sink, child);
    }
    let node = arena.get_mut(id);
    node.status = Status::Unstaged;
    node.staged = None;
}

fn destroy_subtree(
    arena: &mut TileArena,
    lru: &mut LruCache,
    sink: &mut dyn RenderSink,
    id: TileId,
) {
    let children = std::mem::take(&mut arena.get_mut(id).committed_children);
    for child in children {
        destroy_subtree(arena, lru, sink, child);
    }
    sink.destroy_tile(id);
    lru.remove(id);
    arena.remove(id);
}
