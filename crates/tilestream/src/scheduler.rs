//! The frame-driven paging scheduler.
//!
//! [`Pager`] owns the tile tree and runs one synchronous pass per
//! rendered frame: drain finished staging batches, traverse the tree
//! against the frame's cameras, dispatch admitted staging requests to
//! the backend, then evict least-recently-used subtrees. Staging work
//! itself never runs on this path (unless the host chose the inline
//! backend, which runs it inside dispatch by design).

use std::sync::{Arc, Mutex, mpsc};

use crate::culling::CamState;
use crate::error::Result;
use crate::fetch::{Fetcher, parent_dir};
use crate::lru::LruCache;
use crate::queue::{InlineBackend, RequestList, StagingBackend, WorkerPool};
use crate::stage::{StageJob, StageOutcome, StagedChild, build_root_children};
use crate::tree::{RenderSink, Status, TileArena, TileId, TileNode, Traversal};

/// Tuning knobs for the pager.
#[derive(Debug, Clone)]
pub struct PagerConfig {
    /// Maximum staging batches in flight at once.
    pub max_concurrent_requests: usize,
    /// Maximum staging requests admitted per frame.
    pub max_queue_size: usize,
    /// Resident-tile ceiling that triggers the eviction pass.
    pub max_resident_tiles: usize,
    /// Fraction below the ceiling eviction aims for, so the pass does
    /// not run every frame while hovering at the limit.
    pub eviction_headroom: f32,
    /// Per-mesh vertex ceiling; larger decoded meshes are split.
    pub max_vertices_per_mesh: usize,
    /// Staging worker threads; zero selects the inline (cooperative)
    /// backend.
    pub workers: usize,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 6,
            max_queue_size: 100,
            max_resident_tiles: 300,
            eviction_headroom: 0.2,
            max_vertices_per_mesh: 50_000,
            workers: 6,
        }
    }
}

/// Live scheduler counters, mostly for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagerStats {
    /// Tiles whose children are being staged right now.
    pub staging: usize,
    /// Tiles staged and waiting for a commit slot.
    pub staged: usize,
    /// Tiles with live committed children.
    pub committed: usize,
    /// Total live tiles in the arena.
    pub resident: usize,
    /// Staging batches dispatched and not yet drained.
    pub in_flight: usize,
}

/// The paged-LOD streaming scheduler.
pub struct Pager {
    config: PagerConfig,
    fetcher: Arc<dyn Fetcher>,
    arena: TileArena,
    lru: LruCache,
    roots: Vec<TileId>,
    backend: Box<dyn StagingBackend>,
    results_tx: mpsc::Sender<StageOutcome>,
    results_rx: mpsc::Receiver<StageOutcome>,
    decode_lock: Arc<Mutex<()>>,
    in_flight: usize,
}

impl Pager {
    /// Open a tile hierarchy: fetch and stage the root container
    /// synchronously, materializing its nodes as root tiles.
    ///
    /// `root_path` is the path of the root `.3mxb` container, resolved
    /// through `fetcher`.
    pub fn open(
        fetcher: Arc<dyn Fetcher>,
        root_path: &str,
        config: PagerConfig,
        sink: &mut dyn RenderSink,
    ) -> Result<Self> {
        let backend: Box<dyn StagingBackend> = if config.workers == 0 {
            Box::new(InlineBackend)
        } else {
            Box::new(WorkerPool::new(config.workers))
        };
        let (results_tx, results_rx) = mpsc::channel();
        let decode_lock = Arc::new(Mutex::new(()));

        let staged = build_root_children(
            fetcher.as_ref(),
            root_path,
            &parent_dir(root_path),
            &decode_lock,
            config.max_vertices_per_mesh,
        )?;

        let mut pager = Self {
            config,
            fetcher,
            arena: TileArena::default(),
            lru: LruCache::default(),
            roots: Vec::new(),
            backend,
            results_tx,
            results_rx,
            decode_lock,
            in_flight: 0,
        };
        pager.roots = pager.materialize_roots(&staged, sink);

        tracing::info!(
            "opened \"{root_path}\": {} root tiles",
            pager.roots.len()
        );
        Ok(pager)
    }

    fn materialize_roots(&mut self, staged: &[StagedChild], sink: &mut dyn RenderSink) -> Vec<TileId> {
        staged
            .iter()
            .map(|child| {
                let (node, payloads) = TileNode::from_staged(child, 0);
                let id = self.arena.insert(node);
                sink.create_tile(id, &child.id, &payloads);
                id
            })
            .collect()
    }

    /// Run one frame of the scheduler.
    ///
    /// `frame` must increase monotonically; `cam_states` holds the
    /// precomputed culling state of every active viewpoint. The pass is
    /// fully synchronous and never blocks on staging work.
    pub fn update(&mut self, frame: u64, cam_states: &[CamState], sink: &mut dyn RenderSink) {
        self.drain_results();

        // Traverse every root, collecting admitted staging requests.
        let mut requests = RequestList::new(self.config.max_queue_size);
        let commit_slots = self
            .config
            .max_concurrent_requests
            .saturating_sub(self.in_flight);
        {
            let mut traversal = Traversal {
                arena: &mut self.arena,
                lru: &mut self.lru,
                requests: &mut requests,
                sink: &mut *sink,
                frame,
                commit_slots,
            };
            for root in self.roots.clone() {
                traversal.traverse(root, cam_states);
            }
        }

        // Dispatch the best requests while in-flight slots remain; the
        // rest stay unstaged and are reconsidered next frame.
        for request in requests.drain_sorted() {
            if self.in_flight >= self.config.max_concurrent_requests {
                break;
            }
            let node = self.arena.get_mut(request.tile);
            debug_assert_eq!(node.status, Status::Unstaged);
            node.status = Status::Staging;
            let job = StageJob {
                tile: request.tile,
                dir: node.dir.clone(),
                children_files: node.children_files.clone(),
                fetcher: Arc::clone(&self.fetcher),
                decode_lock: Arc::clone(&self.decode_lock),
                max_vertices_per_mesh: self.config.max_vertices_per_mesh,
                results: self.results_tx.clone(),
            };
            self.in_flight += 1;
            self.backend.submit(job);
        }

        // With the inline backend, jobs have already finished inside
        // submit; drain them now so Staged tiles commit next frame
        // rather than two frames later.
        self.drain_results();

        self.lru.evict_pass(
            &mut self.arena,
            sink,
            frame,
            self.config.max_resident_tiles,
            self.config.eviction_headroom,
        );
    }

    /// Apply finished staging batches to the tree.
    fn drain_results(&mut self) {
        while let Ok(outcome) = self.results_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            let node = self.arena.get_mut(outcome.tile);
            if node.status != Status::Staging {
                tracing::debug!(
                    "dropping stale staging result for tile \"{}\"",
                    node.id
                );
                continue;
            }
            match outcome.result {
                Ok(children) => {
                    node.staged = Some(children);
                    node.status = Status::Staged;
                }
                Err(e) => {
                    // The tile stays coarse and retries on a later
                    // eligible traversal; the frame loop never sees
                    // the failure.
                    node.status = Status::Unstaged;
                    tracing::warn!("staging failed for tile \"{}\": {e}", node.id);
                }
            }
        }
    }

    /// Finish in-flight staging work and release the backend.
    pub fn shutdown(&mut self) {
        self.backend.shutdown();
        self.drain_results();
    }

    /// The root tiles created by [`Pager::open`].
    #[must_use]
    pub fn roots(&self) -> &[TileId] {
        &self.roots
    }

    /// Borrow the tile arena (read-only host access).
    #[must_use]
    pub fn arena(&self) -> &TileArena {
        &self.arena
    }

    /// Current scheduler counters.
    #[must_use]
    pub fn stats(&self) -> PagerStats {
        let mut stats = PagerStats {
            staging: 0,
            staged: 0,
            committed: 0,
            resident: self.arena.len(),
            in_flight: self.in_flight,
        };
        for (_, node) in self.arena.iter() {
            match node.status {
                Status::Staging => stats.staging += 1,
                Status::Staged => stats.staged += 1,
                Status::Committed => stats.committed += 1,
                Status::Unstaged => {}
            }
        }
        stats
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        self.backend.shutdown();
    }
}
