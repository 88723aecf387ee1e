//! Change tracking between two points in the tree's life.

use std::collections::HashMap;

use serde::Serialize;

use crate::store::Node;
use crate::tree::MailboxTree;

/// Ids added, changed, or removed since the last snapshot. Lists are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeDiff {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct DiffEngine {
    snapshot: Option<HashMap<String, Node>>,
}

impl DiffEngine {
    pub fn start(&mut self, nodes: &HashMap<String, Node>) {
        self.snapshot = Some(nodes.clone());
    }

    /// Compares the current node table against the snapshot. `None` when no
    /// snapshot was taken, the change flag never fired, or nothing differs.
    pub fn compute(&self, nodes: &HashMap<String, Node>, changed: bool) -> Option<TreeDiff> {
        if !changed {
            return None;
        }
        let snapshot = self.snapshot.as_ref()?;

        let mut added = Vec::new();
        let mut modified = Vec::new();
        for (id, node) in nodes {
            match snapshot.get(id) {
                None => added.push(id.clone()),
                Some(old) if old != node => modified.push(id.clone()),
                Some(_) => {}
            }
        }
        let mut removed: Vec<String> = snapshot
            .keys()
            .filter(|id| !nodes.contains_key(*id))
            .cloned()
            .collect();

        if added.is_empty() && modified.is_empty() && removed.is_empty() {
            return None;
        }
        added.sort();
        modified.sort();
        removed.sort();
        Some(TreeDiff { added, changed: modified, removed })
    }
}

impl MailboxTree {
    /// Snapshots the current tree for later comparison with [`diff`](Self::diff).
    pub fn diff_start(&mut self) {
        self.diff.start(self.store.nodes_table());
    }

    /// Returns what changed since the last [`diff_start`](Self::diff_start),
    /// or `None` when nothing did (or no snapshot exists).
    pub fn diff(&self) -> Option<TreeDiff> {
        self.diff.compute(self.store.nodes_table(), self.store.changed)
    }
}
