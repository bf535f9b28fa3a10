//! Staging request admission and the worker-side job queue.
//!
//! Traversal produces bounded, priority-ordered staging requests each
//! frame; the scheduler dispatches as many as the in-flight cap allows
//! and hands the resulting jobs to a [`StagingBackend`]. Two backends
//! implement the same interface: a pool of blocking worker threads and
//! an inline backend that runs jobs cooperatively on the caller's
//! thread.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::stage::StageJob;
use crate::tree::TileId;

/// Staging priority: `depth - 1 / distance`.
///
/// Lower values are served first, so shallow (coarse) tiles win, and
/// among equals the tile closest to a camera wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Priority(pub f32);

impl Priority {
    /// Priority for a tile at `depth` whose bounding sphere is
    /// `distance` away from the nearest camera.
    #[must_use]
    pub fn new(depth: usize, distance: f32) -> Self {
        Self(depth as f32 - 1.0 / distance)
    }
}

impl Eq for Priority {}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A tile waiting for a staging slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageRequest {
    pub tile: TileId,
    pub priority: Priority,
}

/// The bounded per-frame admission list.
///
/// Traversal pushes eligible tiles; a full list rejects further pushes
/// and the rejected tiles simply stay unstaged until a later frame.
#[derive(Debug)]
pub(crate) struct RequestList {
    entries: Vec<StageRequest>,
    capacity: usize,
}

impl RequestList {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Whether the list has reached its size bound.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Add a request; returns false (and drops it) when full.
    pub fn push(&mut self, request: StageRequest) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(request);
        true
    }

    /// Consume the list in priority order, best first.
    pub fn drain_sorted(mut self) -> impl Iterator<Item = StageRequest> {
        self.entries.sort_by_key(|r| r.priority);
        self.entries.into_iter()
    }
}

/// Executes staging jobs handed over by the scheduler's dispatch pass.
///
/// Implementations must not block dispatch: `submit` queues or runs the
/// job and returns. Job results travel back over the channel embedded
/// in each job, never through this trait.
pub trait StagingBackend: Send {
    /// Accept one job for execution.
    fn submit(&self, job: StageJob);

    /// Finish all accepted jobs and release resources.
    ///
    /// Drain-and-join: every job submitted before the call still runs
    /// to completion before this returns.
    fn shutdown(&mut self);
}

/// Runs jobs synchronously on the calling thread.
///
/// The cooperative backend for hosts without worker threads; staging
/// work happens inside the scheduler's dispatch pass, time-sliced by
/// the in-flight cap.
#[derive(Debug, Default)]
pub struct InlineBackend;

impl StagingBackend for InlineBackend {
    fn submit(&self, job: StageJob) {
        job.run();
    }

    fn shutdown(&mut self) {}
}

/// The shared job queue between the dispatcher and the worker threads.
///
/// A bounded mutex-and-condvar queue: the traversal side pushes, worker
/// threads block in [`JobQueue::pop_wait`]. Shutdown wakes everyone;
/// workers drain what remains before exiting.
#[derive(Debug, Default)]
struct JobQueue {
    inner: Mutex<JobQueueInner>,
    available: Condvar,
}

#[derive(Debug, Default)]
struct JobQueueInner {
    jobs: VecDeque<StageJob>,
    shutdown: bool,
}

impl JobQueue {
    fn push(&self, job: StageJob) {
        let mut inner = self.inner.lock().unwrap();
        inner.jobs.push_back(job);
        drop(inner);
        self.available.notify_one();
    }

    /// Block until a job is available; `None` once the queue is shut
    /// down and drained.
    fn pop_wait(&self) -> Option<StageJob> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(job) = inner.jobs.pop_front() {
                return Some(job);
            }
            if inner.shutdown {
                return None;
            }
            inner = self.available.wait(inner).unwrap();
        }
    }

    fn shutdown(&self) {
        self.inner.lock().unwrap().shutdown = true;
        self.available.notify_all();
    }
}

/// A fixed-width pool of staging worker threads.
///
/// Suspension points are whole jobs: a worker picks up one tile's
/// staging batch, runs it to completion, and only then looks at the
/// queue again.
#[derive(Debug)]
pub struct WorkerPool {
    queue: Arc<JobQueue>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` staging threads (at least one).
    #[must_use]
    pub fn new(workers: usize) -> Self {
        let queue = Arc::new(JobQueue::default());
        let handles = (0..workers.max(1))
            .map(|i| {
                let queue = Arc::clone(&queue);
                std::thread::Builder::new()
                    .name(format!("tilestream-stage-{i}"))
                    .spawn(move || {
                        while let Some(job) = queue.pop_wait() {
                            job.run();
                        }
                    })
                    .expect("failed to spawn staging worker")
            })
            .collect();
        Self { queue, handles }
    }
}

impl StagingBackend for WorkerPool {
    fn submit(&self, job: StageJob) {
        self.queue.push(job);
    }

    fn shutdown(&mut self) {
        self.queue.shutdown();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        // Shallower tiles first; among equals, closer tiles first.
        let coarse_near = Priority::new(1, 10.0);
        let coarse_far = Priority::new(1, 1000.0);
        let fine_near = Priority::new(5, 10.0);

        assert!(coarse_near < coarse_far);
        assert!(coarse_far < fine_near);
    }

    #[test]
    fn test_request_list_bounds_and_sorts() {
        let mut list = RequestList::new(2);
        assert!(list.push(StageRequest {
            tile: TileId(0),
            priority: Priority::new(3, 1.0),
        }));
        assert!(list.push(StageRequest {
            tile: TileId(1),
            priority: Priority::new(1, 1.0),
        }));
        // Bounded: the third request is rejected, not queued.
        assert!(!list.push(StageRequest {
            tile: TileId(2),
            priority: Priority::new(0, 1.0),
        }));

        let order: Vec<usize> = list.drain_sorted().map(|r| r.tile.0).collect();
        assert_eq!(order, vec![1, 0]);
    }
}
