//! Frame-marked LRU bookkeeping for committed tiles.

use std::collections::HashMap;

use crate::tree::{RenderSink, Status, TileArena, TileId, unload_children};

/// Tracks which tiles hold committed children and when each was last
/// needed, and evicts the stalest once the resident count exceeds its
/// ceiling.
#[derive(Debug, Default)]
pub(crate) struct LruCache {
    /// Tile -> frame counter of the last traversal that needed it.
    last_used: HashMap<TileId, u64>,
}

impl LruCache {
    /// Register a tile that just committed its children.
    pub fn add(&mut self, id: TileId, frame: u64) {
        self.last_used.insert(id, frame);
    }

    /// Record that a traversal needed the tile this frame.
    ///
    /// Unknown ids are ignored, so callers may mark liberally.
    pub fn mark_used(&mut self, id: TileId, frame: u64) {
        if let Some(entry) = self.last_used.get_mut(&id) {
            *entry = frame;
        }
    }

    /// Drop a tile from the bookkeeping (evicted or destroyed).
    pub fn remove(&mut self, id: TileId) {
        self.last_used.remove(&id);
    }

    /// Evict least-recently-used committed subtrees until the resident
    /// count is back under the ceiling (with headroom).
    ///
    /// Runs once per frame after traversal. Candidates are ordered by
    /// (least recently used, then deepest first); anything needed this
    /// frame — which includes every ancestor of in-flight staging work,
    /// marked during traversal — is skipped, as is anything not
    /// currently Committed.
    pub fn evict_pass(
        &mut self,
        arena: &mut TileArena,
        sink: &mut dyn RenderSink,
        frame: u64,
        max_resident: usize,
        headroom: f32,
    ) {
        if self.last_used.len() <= max_resident {
            return;
        }
        let target = (max_resident as f32 * (1.0 - headroom)) as usize;

        let mut candidates: Vec<(u64, usize, TileId)> = self
            .last_used
            .iter()
            .filter(|&(&id, &last_used)| {
                last_used < frame && arena.get(id).status == Status::Committed
            })
            .map(|(&id, &last_used)| (last_used, arena.get(id).depth, id))
            .collect();
        // Least recently used first; deepest first on ties.
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        for (_, _, id) in candidates {
            if self.last_used.len() <= target {
                break;
            }
            // Eviction may have destroyed this tile already as part of
            // an ancestor's subtree.
            if !self.last_used.contains_key(&id) {
                continue;
            }
            tracing::debug!(
                "evicting tile \"{}\" (depth {})",
                arena.get(id).id,
                arena.get(id).depth
            );
            unload_children(arena, self, sink, id);
            self.last_used.remove(&id);
        }
    }
}
