//! Pre-order traversal over the visible part of the tree.
//!
//! The cursor holds a position (index into a sibling list plus that list's
//! parent) and a stack of saved positions for the levels it has descended
//! through. Advancing skips invisible nodes and, under `SHOW_CLOSED`, pulls
//! undiscovered levels in on demand.

use crate::tree::MailboxTree;
use crate::types::{NodeView, Traverse, TreeMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pos {
    pub key: usize,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Cursor {
    /// `None` until `reset()`, and again once the walk is exhausted.
    pub pos: Option<Pos>,
    pub stack: Vec<Pos>,
}

impl MailboxTree {
    /// Rewinds the cursor to the first root element and returns it. Sorts
    /// the root level if needed. In news mode the first element may be
    /// invisible, in which case the cursor advances to the first visible
    /// one.
    pub fn reset(&mut self) -> Option<NodeView> {
        self.cursor = Cursor { pos: Some(Pos { key: 0, parent: None }), stack: Vec::new() };
        if self.store.needs_sort(None) {
            self.store.sort_children(None);
        }
        if self.config.mode == TreeMode::News {
            if let Some(id) = self.cursor_id() {
                if !self.visible(&id) {
                    return self.advance(Traverse::empty());
                }
            }
        }
        self.current()
    }

    /// The element under the cursor, without moving it.
    pub fn current(&mut self) -> Option<NodeView> {
        let id = self.cursor_id()?;
        let view = self.view(&id);
        self.sync_stale_opens();
        view
    }

    /// Moves to the next visible element and returns it, or `None` once the
    /// walk is exhausted (or was never started).
    pub fn advance(&mut self, mask: Traverse) -> Option<NodeView> {
        let found = loop {
            let Some(pos) = self.cursor.pos.clone() else { break None };
            let saved_view = self.store.show_unsub;
            if mask.contains(Traverse::SUBSCRIBED_ONLY) {
                self.store.show_unsub = false;
            }

            // Step into the current element when it is visible and open (or
            // closed levels were requested); otherwise move along the level.
            let mut descended = false;
            if let Some(id) = self.cursor_id() {
                if self.visible(&id)
                    && (mask.contains(Traverse::SHOW_CLOSED) || self.store.is_open(&id))
                    && pos.parent.as_deref() != Some(id.as_str())
                {
                    self.cursor.stack.push(pos.clone());
                    if self.store.needs_sort(Some(&id)) {
                        self.store.sort_children(Some(&id));
                    }
                    self.cursor.pos = Some(Pos { key: 0, parent: Some(id) });
                    descended = true;
                }
            }
            if !descended {
                self.cursor.pos = Some(Pos { key: pos.key + 1, parent: pos.parent });
            }

            // Walked past the end of an undiscovered level that is known to
            // have children: fetch it now and retry.
            if self.cursor_id().is_none() && mask.contains(Traverse::SHOW_CLOSED) {
                let parent = self.cursor.pos.as_ref().and_then(|p| p.parent.clone());
                if let Some(pid) = parent {
                    if !self.store.is_discovered(&pid) && self.store.has_children(&pid) {
                        let info = self.children_info(&pid);
                        self.add_level(info);
                    }
                }
            }

            // Unwind to the nearest ancestor level with elements left.
            while self.cursor_id().is_none() {
                match self.cursor.stack.pop() {
                    Some(top) => {
                        self.cursor.pos = Some(Pos { key: top.key + 1, parent: top.parent });
                    }
                    None => {
                        self.cursor.pos = None;
                        break;
                    }
                }
            }

            let next = self.cursor_id();
            let next_visible = next.as_deref().map(|id| {
                let id = id.to_string();
                self.visible(&id)
            });
            self.store.show_unsub = saved_view;
            match (next, next_visible) {
                (Some(id), Some(true)) => break Some(id),
                (Some(_), _) => {} // invisible: keep walking
                (None, _) => break None,
            }
        };
        self.sync_stale_opens();
        found.and_then(|id| self.view(&id))
    }

    /// Whether a later sibling on the cursor's level is visible. Does not
    /// move the cursor.
    pub fn peek(&mut self, mask: Traverse) -> bool {
        let Some(pos) = self.cursor.pos.clone() else { return false };
        let saved_view = self.store.show_unsub;
        if mask.contains(Traverse::SUBSCRIBED_ONLY) {
            self.store.show_unsub = false;
        }

        let mut found = false;
        let mut key = pos.key + 1;
        while let Some(id) = self.store.children_of(pos.parent.as_deref()).get(key).cloned() {
            if self.visible(&id) {
                found = true;
                break;
            }
            key += 1;
        }

        self.store.show_unsub = saved_view;
        self.sync_stale_opens();
        found
    }

    fn cursor_id(&self) -> Option<String> {
        let pos = self.cursor.pos.as_ref()?;
        self.store.children_of(pos.parent.as_deref()).get(pos.key).cloned()
    }
}
