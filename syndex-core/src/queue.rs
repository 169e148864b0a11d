use std::collections::{HashSet, VecDeque};

use crate::mapper::parent_of;

/// FIFO queue of indexer paths awaiting a scan, with set semantics: a
/// path already queued is never queued twice. Once dispatched it may be
/// queued again.
///
/// The rolling-burst fields belong to the coalescer's sibling-collapse
/// heuristic; they live here so queue and burst state sit under the one
/// mutex the poll and dispatch tasks share.
#[derive(Debug, Default)]
pub struct ScanQueue {
    entries: VecDeque<String>,
    members: HashSet<String>,
    pub(crate) burst_parent: Option<String>,
    pub(crate) burst_run: usize,
}

impl ScanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless it is already queued. Returns whether the
    /// queue changed.
    pub fn push(&mut self, path: String) -> bool {
        if self.members.contains(&path) {
            return false;
        }
        self.members.insert(path.clone());
        self.entries.push_back(path);
        true
    }

    pub fn pop(&mut self) -> Option<String> {
        let path = self.entries.pop_front()?;
        self.members.remove(&path);
        Some(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.members.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove up to `limit` entries from the tail whose parent is
    /// `parent`, stopping at the first entry that does not match.
    /// Returns the number removed. Bounded look-back: never a full scan.
    pub(crate) fn collapse_tail(&mut self, parent: &str, limit: usize) -> usize {
        let mut removed = 0;
        while removed < limit {
            let tail_matches = self
                .entries
                .back()
                .is_some_and(|entry| parent_of(entry) == parent);
            if !tail_matches {
                break;
            }
            if let Some(entry) = self.entries.pop_back() {
                self.members.remove(&entry);
                removed += 1;
            }
        }
        removed
    }

    /// Queued paths in dispatch order.
    pub fn paths(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}
