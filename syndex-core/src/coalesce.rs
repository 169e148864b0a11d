use tracing::debug;

use crate::events::{ChangeAction, ChangeEvent, ItemKind};
use crate::mapper::{FolderMap, parent_of};
use crate::queue::ScanQueue;

/// Consecutive same-parent events after which the rest of a burst is
/// collapsed into a single parent-directory scan.
pub const DEFAULT_BURST_THRESHOLD: usize = 9;

/// Turns classified change events into a minimal set of queued scan
/// paths.
///
/// Per event: deletions queue the parent directory (the item itself is
/// gone and cannot be scanned); files queue themselves unless their
/// parent is already queued; directories queue themselves. Every enqueue
/// has set semantics.
///
/// On top of that, a run of `threshold` consecutive events sharing one
/// parent collapses the queued tail of the run into the parent itself, so
/// a mass copy or an unpacked archive costs one directory scan instead of
/// hundreds of file scans.
#[derive(Debug, Clone)]
pub struct Coalescer {
    mapper: FolderMap,
    threshold: usize,
}

impl Coalescer {
    pub fn new(mapper: FolderMap) -> Self {
        Self::with_threshold(mapper, DEFAULT_BURST_THRESHOLD)
    }

    pub fn with_threshold(mapper: FolderMap, threshold: usize) -> Self {
        Self { mapper, threshold }
    }

    /// Apply a polled batch to the queue. Returns the number of enqueue
    /// operations that extended the queue (the burst heuristic may remove
    /// some of those entries again before the batch is done).
    ///
    /// Events are grouped by folder, first-seen order, and processed in
    /// arrival order within each group. The burst counter starts fresh
    /// for every group and never carries across batches.
    pub fn apply(&self, queue: &mut ScanQueue, events: &[ChangeEvent]) -> usize {
        let mut folders: Vec<&str> = Vec::new();
        for event in events {
            if !folders.contains(&event.folder.as_str()) {
                folders.push(&event.folder);
            }
        }

        let mut enqueued = 0;
        for folder in folders {
            queue.burst_parent = None;
            queue.burst_run = 0;
            for event in events.iter().filter(|e| e.folder == folder) {
                enqueued += self.apply_one(queue, event);
            }
        }
        enqueued
    }

    fn apply_one(&self, queue: &mut ScanQueue, event: &ChangeEvent) -> usize {
        let Some(own) = self.mapper.resolve(&event.folder, &event.path) else {
            debug!(folder = %event.folder, "ignoring event for unmapped folder");
            return 0;
        };
        let Some(parent) = self.mapper.resolve(&event.folder, parent_of(&event.path)) else {
            return 0;
        };

        let mut enqueued = 0;
        match (event.action, event.kind) {
            (ChangeAction::Deleted, _) => {
                if queue.push(parent.clone()) {
                    enqueued += 1;
                }
            }
            (_, ItemKind::File) => {
                if queue.contains(&parent) {
                    debug!(path = %own, "parent already queued, skipping child");
                } else if queue.push(own) {
                    enqueued += 1;
                }
            }
            (_, ItemKind::Dir) => {
                if queue.push(own) {
                    enqueued += 1;
                }
            }
        }

        if queue.burst_parent.as_deref() == Some(parent.as_str()) {
            queue.burst_run += 1;
        } else {
            queue.burst_parent = Some(parent.clone());
            queue.burst_run = 1;
        }

        if queue.burst_run == self.threshold {
            let removed = queue.collapse_tail(&parent, self.threshold);
            if queue.push(parent.clone()) {
                enqueued += 1;
            }
            debug!(
                parent = %parent,
                removed,
                "sibling burst collapsed into parent scan"
            );
        }

        enqueued
    }
}
