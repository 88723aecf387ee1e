//! Lazy discovery: fetching levels from the provider and merging them in.

use crate::provider::{ChildrenHint, MailboxEntry};
use crate::store::Attr;
use crate::tree::MailboxTree;

/// How discovered nodes are merged.
///
/// `Bulk` brackets initialization (and the unsubscribed-view merge): open
/// state is evaluated from configuration instead of toggled, and never
/// reaches the persistence collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DiscoveryMode {
    Incremental,
    Bulk { fetch_all: bool },
}

impl MailboxTree {
    /// Expands a mailbox, discovering its children on first use.
    pub fn expand(&mut self, name: &str) {
        let id = self.store.convert_name(name);
        self.expand_with(&id, false);
        self.sync_stale_opens();
    }

    /// Expands every element at the root level, recursively.
    pub fn expand_all(&mut self) {
        for id in self.store.children_of(None).to_vec() {
            self.expand_with(&id, true);
        }
        self.sync_stale_opens();
    }

    /// Collapses a mailbox. Discovered children stay in the store.
    pub fn collapse(&mut self, name: &str) {
        let id = self.store.convert_name(name);
        if !self.store.contains(&id) {
            return;
        }
        self.store.changed = true;
        self.mark_open(&id, false);
    }

    /// Collapses every element and clears the persisted open-folder set.
    pub fn collapse_all(&mut self) {
        for id in self.store.node_ids() {
            self.store.set_open(&id, false);
        }
        self.store.changed = true;
        self.ensure_expanded();
        if let Some(expanded) = self.expanded.as_mut() {
            let ids: Vec<String> = expanded.drain().collect();
            if let Some(store) = self.open_folders.as_mut() {
                for id in &ids {
                    store.remove(id);
                }
            }
        }
    }

    pub(crate) fn expand_with(&mut self, id: &str, expand_all: bool) {
        if !self.store.contains(id) {
            return;
        }
        self.store.changed = true;
        if !self.store.has_children(id) {
            return;
        }

        if !self.store.is_discovered(id) {
            let info = self.children_info(id);
            if info.is_empty() {
                return;
            }
            match self.discovery {
                DiscoveryMode::Bulk { fetch_all } => {
                    // During bulk merges only nodes that start out open (or
                    // everything, when prefetching) pull their children in.
                    if fetch_all || self.initial_open(id) {
                        self.add_level(info);
                    }
                }
                DiscoveryMode::Incremental => {
                    self.add_level(info);
                    self.mark_open(id, true);
                }
            }
            return;
        }

        if !matches!(self.discovery, DiscoveryMode::Bulk { fetch_all: true }) {
            self.mark_open(id, true);
        }
        if expand_all {
            for child in self.store.children_of(Some(id)).to_vec() {
                self.expand_with(&child, true);
            }
        }
    }

    /// Fetches the direct children of `id` and updates its hint from the
    /// result. The search is scoped to the node's namespace delimiter; when
    /// the personal namespace nests the inbox itself, the prefix is applied
    /// twice so `INBOX`'s children resolve against their real names.
    pub(crate) fn children_info(&mut self, id: &str) -> Vec<MailboxEntry> {
        let ns = self.store.namespace_for(id);
        let mut search = format!("{id}{}", ns.delimiter);
        if id == "INBOX" && ns.prefix == format!("INBOX{}", ns.delimiter) {
            search.push_str(&ns.prefix);
        }
        log::debug!("discovering children of {id:?} via {search:?}");
        let info = self.list_or_empty(&format!("{search}%"));

        if self.store.contains(id) {
            let hint =
                if info.is_empty() { ChildrenHint::HasNone } else { ChildrenHint::Has };
            self.store.set_hint(id, hint);
            self.store.invalidate_children(id);
        }
        info
    }

    /// Merges a fetched level into the store. Missing ancestors are
    /// synthesized as containers, affected parents are marked discovered,
    /// and children that should start out open are expanded recursively.
    pub(crate) fn add_level(&mut self, entries: Vec<MailboxEntry>) {
        if entries.is_empty() {
            return;
        }
        let fetch_all = matches!(self.discovery, DiscoveryMode::Bulk { fetch_all: true });
        let mut parents: Vec<Option<String>> = Vec::new();

        for entry in entries {
            let node = self.make_element(&entry);
            let id = node.id.clone();
            let parent = node.parent.clone();
            let subscribed = node.attrs.contains(Attr::IS_SUBSCRIBED);
            self.ensure_ancestors(parent.as_deref());
            if self.store.insert_element(node) {
                self.store.note_child_added(parent.as_deref());
                self.store.record_membership(&id, subscribed);
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
                if fetch_all || self.open_for(&id) {
                    self.expand_with(&id, false);
                }
            }
        }

        for parent in parents {
            self.store.set_discovered(parent.as_deref(), true);
        }
        self.store.changed = true;
    }

    /// Synthesizes the ancestor chain of `parent` as containers, bottom-up.
    fn ensure_ancestors(&mut self, parent: Option<&str>) {
        let Some(p) = parent else { return };
        if self.store.contains(p) {
            return;
        }
        let entry = MailboxEntry {
            name: p.to_string(),
            selectable: false,
            children: ChildrenHint::Unknown,
            namespace_boundary: false,
        };
        let node = self.make_element(&entry);
        let grandparent = node.parent.clone();
        self.ensure_ancestors(grandparent.as_deref());
        if self.store.insert_element(node) {
            self.store.note_child_added(grandparent.as_deref());
        }
    }

    /// Whether `id` counts as open under the current discovery mode.
    pub(crate) fn open_for(&mut self, id: &str) -> bool {
        match self.discovery {
            DiscoveryMode::Incremental => self.store.is_open(id),
            DiscoveryMode::Bulk { .. } => self.initial_open(id),
        }
    }

    /// Toggles a node's open state, mirroring it to the persisted set
    /// outside bulk merges.
    pub(crate) fn mark_open(&mut self, id: &str, open: bool) {
        self.store.set_open(id, open);
        if self.discovery != DiscoveryMode::Incremental {
            return;
        }
        self.ensure_expanded();
        if open {
            if let Some(set) = self.expanded.as_mut() {
                set.insert(id.to_string());
            }
            if let Some(store) = self.open_folders.as_mut() {
                store.add(id);
            }
        } else {
            if let Some(set) = self.expanded.as_mut() {
                set.remove(id);
            }
            if let Some(store) = self.open_folders.as_mut() {
                store.remove(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::provider::{MemoryDirectory, MemoryOpenFolders};
    use crate::tree::{MailboxTree, TreeConfig};
    use crate::types::{InitOptions, InitialExpand};

    fn make_dir() -> MemoryDirectory {
        let dir = MemoryDirectory::new('/');
        for name in ["INBOX", "INBOX/Work", "INBOX/Work/Sub", "INBOX/Work/Sub/Deep"] {
            dir.add(name);
            dir.subscribe(name);
        }
        dir
    }

    fn make_tree(dir: &MemoryDirectory, opts: InitOptions) -> MailboxTree {
        let mut tree = MailboxTree::new(TreeConfig::default(), Box::new(dir.clone()));
        tree.initialize(opts);
        tree
    }

    #[test]
    fn expand_fetches_exactly_one_scoped_listing() {
        let dir = make_dir();
        let mut tree =
            make_tree(&dir, InitOptions { show_unsubscribed: true, ..InitOptions::default() });
        tree.expand("INBOX");
        dir.clear_list_calls();

        tree.expand("INBOX/Work");
        assert_eq!(dir.list_calls(), ["INBOX/Work/%"]);

        let work = tree.get("INBOX/Work").unwrap();
        assert!(work.is_discovered);
        assert!(work.is_open);
        assert!(tree.get("INBOX/Work/Sub").is_some());
        // Only one level came in.
        assert!(!tree.get("INBOX/Work/Sub").unwrap().is_discovered);
    }

    #[test]
    fn expanding_a_leaf_is_a_noop() {
        let dir = make_dir();
        let mut tree =
            make_tree(&dir, InitOptions { show_unsubscribed: true, ..InitOptions::default() });
        tree.expand("INBOX");
        tree.expand("INBOX/Work");
        tree.expand("INBOX/Work/Sub");
        dir.clear_list_calls();

        tree.expand("INBOX/Work/Sub/Deep");
        assert!(dir.list_calls().is_empty());
        assert!(!tree.get("INBOX/Work/Sub/Deep").unwrap().is_open);
    }

    #[test]
    fn collapse_keeps_discovered_children() {
        let dir = make_dir();
        let mut tree =
            make_tree(&dir, InitOptions { show_unsubscribed: true, ..InitOptions::default() });
        tree.expand("INBOX");
        assert!(tree.get("INBOX").unwrap().is_open);

        tree.collapse("INBOX");
        let inbox = tree.get("INBOX").unwrap();
        assert!(!inbox.is_open);
        assert!(inbox.is_discovered);
        assert!(tree.get("INBOX/Work").is_some());

        // Re-expanding needs no further provider traffic.
        dir.clear_list_calls();
        tree.expand("INBOX");
        assert!(dir.list_calls().is_empty());
        assert!(tree.get("INBOX").unwrap().is_open);
    }

    #[test]
    fn fetch_all_discovers_the_whole_hierarchy() {
        let dir = make_dir();
        let mut tree =
            make_tree(&dir, InitOptions { show_unsubscribed: true, fetch_all: true });
        let deep = tree.get("INBOX/Work/Sub/Deep").unwrap();
        assert_eq!(deep.depth, 3);
        // Prefetched, but nothing starts out open.
        assert!(!tree.get("INBOX").unwrap().is_open);
        assert!(!tree.get("INBOX/Work").unwrap().is_open);
    }

    #[test]
    fn open_state_persists_only_in_incremental_mode() {
        let dir = make_dir();
        let open = MemoryOpenFolders::new();
        let mut tree = MailboxTree::new(TreeConfig::default(), Box::new(dir.clone()))
            .with_open_folder_store(Box::new(open.clone()));
        tree.initialize(InitOptions { show_unsubscribed: true, ..InitOptions::default() });

        tree.expand("INBOX");
        assert!(open.contains("INBOX"));
        tree.collapse("INBOX");
        assert!(!open.contains("INBOX"));
    }

    #[test]
    fn initial_expand_user_restores_persisted_state() {
        let dir = make_dir();
        let open = MemoryOpenFolders::new();
        open.insert("INBOX");
        let config = TreeConfig { initial_expand: InitialExpand::User, ..TreeConfig::default() };
        let mut tree = MailboxTree::new(config, Box::new(dir.clone()))
            .with_open_folder_store(Box::new(open.clone()));
        tree.initialize(InitOptions { show_unsubscribed: true, ..InitOptions::default() });

        // INBOX came back open and its children were discovered during
        // initialization; nothing else did.
        let inbox = tree.get("INBOX").unwrap();
        assert!(inbox.is_open);
        assert!(inbox.is_discovered);
        assert!(tree.get("INBOX/Work").is_some());
        assert!(!tree.get("INBOX/Work").unwrap().is_open);
    }

    #[test]
    fn collapse_all_clears_open_state_everywhere() {
        let dir = make_dir();
        let open = MemoryOpenFolders::new();
        let mut tree = MailboxTree::new(TreeConfig::default(), Box::new(dir.clone()))
            .with_open_folder_store(Box::new(open.clone()));
        tree.initialize(InitOptions { show_unsubscribed: true, ..InitOptions::default() });
        tree.expand("INBOX");
        tree.expand("INBOX/Work");

        tree.collapse_all();
        assert!(!tree.get("INBOX").unwrap().is_open);
        assert!(!tree.get("INBOX/Work").unwrap().is_open);
        assert!(open.snapshot().is_empty());
    }

    #[test]
    fn expand_all_opens_every_discovered_branch() {
        let dir = make_dir();
        let mut tree =
            make_tree(&dir, InitOptions { show_unsubscribed: true, ..InitOptions::default() });
        tree.expand("INBOX");
        tree.expand("INBOX/Work");
        tree.collapse("INBOX/Work");
        tree.collapse("INBOX");

        tree.expand_all();
        assert!(tree.get("INBOX").unwrap().is_open);
        assert!(tree.get("INBOX/Work").unwrap().is_open);
        assert!(tree.get("INBOX/Work/Sub").unwrap().is_open);
    }

    #[test]
    fn failed_discovery_leaves_node_childless() {
        let dir = make_dir();
        let mut tree =
            make_tree(&dir, InitOptions { show_unsubscribed: true, ..InitOptions::default() });
        dir.fail_listings(true);

        tree.expand("INBOX");
        let inbox = tree.get("INBOX").unwrap();
        assert!(!inbox.is_open);
        assert!(!inbox.is_discovered);
        assert!(tree.get("INBOX/Work").is_none());
    }
}
