//! The mailbox tree facade.
//!
//! `MailboxTree` ties the store, the discovery machinery, the cursor and the
//! diff engine to a directory provider and the optional persistence
//! collaborators. All consumer-facing operations live on this type; the
//! traversal and discovery halves of its `impl` are in `cursor.rs` and
//! `discovery.rs`.

use std::collections::HashSet;

use crate::cursor::Cursor;
use crate::diff::DiffEngine;
use crate::discovery::DiscoveryMode;
use crate::namespace::Namespace;
use crate::provider::{
    ChildrenHint, DirectoryProvider, MailboxEntry, OpenFolderStore, PollListStore,
};
use crate::store::{Attr, Node, TreeStore};
use crate::types::{InitOptions, InitialExpand, NodeView, TreeMode};

/// Static configuration for a [`MailboxTree`].
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub mode: TreeMode,
    /// Configured namespaces. A default personal namespace is synthesized
    /// when none has an empty prefix.
    pub namespaces: Vec<Namespace>,
    /// Hierarchy delimiter for the synthesized personal namespace and for
    /// batch-path ordering.
    pub default_delimiter: char,
    /// Open state of freshly discovered folders during bulk initialization.
    pub initial_expand: InitialExpand,
    /// Whether folders whose label starts with `.` enter the tree.
    pub show_dotfiles: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            mode: TreeMode::Mail,
            namespaces: Vec::new(),
            default_delimiter: '/',
            initial_expand: InitialExpand::None,
            show_dotfiles: false,
        }
    }
}

/// A lazily-discovered, filterable, sortable view of a mailbox hierarchy.
pub struct MailboxTree {
    pub(crate) config: TreeConfig,
    pub(crate) store: TreeStore,
    pub(crate) provider: Box<dyn DirectoryProvider>,
    pub(crate) open_folders: Option<Box<dyn OpenFolderStore>>,
    pub(crate) poll_list: Option<Box<dyn PollListStore>>,
    /// Session cache of the persisted open-folder set.
    pub(crate) expanded: Option<HashSet<String>>,
    /// Session cache of the persisted poll list.
    pub(crate) poll: Option<HashSet<String>>,
    pub(crate) discovery: DiscoveryMode,
    pub(crate) cursor: Cursor,
    pub(crate) diff: DiffEngine,
}

impl MailboxTree {
    pub fn new(config: TreeConfig, provider: Box<dyn DirectoryProvider>) -> Self {
        let store = TreeStore::new(
            config.mode,
            config.namespaces.clone(),
            config.default_delimiter,
            config.show_dotfiles,
        );
        Self {
            config,
            store,
            provider,
            open_folders: None,
            poll_list: None,
            expanded: None,
            poll: None,
            discovery: DiscoveryMode::Incremental,
            cursor: Cursor::default(),
            diff: DiffEngine::default(),
        }
    }

    pub fn with_open_folder_store(mut self, store: Box<dyn OpenFolderStore>) -> Self {
        self.open_folders = Some(store);
        self
    }

    pub fn with_poll_list_store(mut self, store: Box<dyn PollListStore>) -> Self {
        self.poll_list = Some(store);
        self
    }

    /// Builds (or rebuilds) the tree from the directory.
    ///
    /// Seeds namespace placeholders, fetches the initial listing (the whole
    /// hierarchy with `fetch_all`, one level otherwise) and merges it in
    /// bulk mode, so initial open state follows
    /// [`TreeConfig::initial_expand`]. In mail mode `INBOX` is always part of
    /// the result.
    pub fn initialize(&mut self, opts: InitOptions) {
        self.store = TreeStore::new(
            self.config.mode,
            self.config.namespaces.clone(),
            self.config.default_delimiter,
            self.config.show_dotfiles,
        );
        self.cursor = Cursor::default();
        self.diff = DiffEngine::default();
        self.expanded = None;
        self.poll = None;
        self.store.show_unsub = opts.show_unsubscribed;
        self.store.unsub_view = opts.show_unsubscribed;
        self.discovery = DiscoveryMode::Bulk { fetch_all: opts.fetch_all };

        self.ensure_subscribed();
        if opts.show_unsubscribed {
            self.ensure_unsubscribed();
        }

        // Placeholders for the non-personal namespaces, so shared and
        // other-user hierarchies have a mount point at the root.
        for ns in self.store.namespaces_vec() {
            if ns.kind == crate::namespace::NamespaceKind::Personal || ns.prefix.is_empty() {
                continue;
            }
            let name = ns.placeholder_name().to_string();
            if self.store.contains(&name) {
                continue;
            }
            let entry = MailboxEntry {
                name,
                selectable: false,
                children: ChildrenHint::Unknown,
                namespace_boundary: true,
            };
            let node = self.make_element(&entry);
            let parent = node.parent.clone();
            if self.store.insert_element(node) {
                self.store.note_child_added(parent.as_deref());
            }
        }

        let wildcard = if opts.fetch_all { '*' } else { '%' };
        let mut entries: Vec<MailboxEntry> = Vec::new();
        let mut seen_patterns = HashSet::new();
        for ns in self.store.namespaces_vec() {
            let pattern = format!("{}{}", ns.prefix, wildcard);
            if !seen_patterns.insert(pattern.clone()) {
                continue;
            }
            if opts.show_unsubscribed {
                entries.extend(self.list_or_empty(&pattern));
            } else {
                // Subscribed-only view starts from the subscription list;
                // the names carry no attributes or hints.
                match self.provider.list_subscribed(&pattern) {
                    Ok(names) => entries.extend(names.into_iter().map(MailboxEntry::new)),
                    Err(err) => {
                        log::warn!("subscription listing for {pattern:?} failed: {err}")
                    }
                }
            }
        }

        if self.config.mode == TreeMode::Mail
            && !entries.iter().any(|e| e.name.eq_ignore_ascii_case("INBOX"))
        {
            let mut inbox = self
                .list_or_empty("INBOX")
                .into_iter()
                .next()
                .unwrap_or_else(|| MailboxEntry::new("INBOX"));
            inbox.name = "INBOX".to_string();
            entries.insert(0, inbox);
        }

        let mut seen_names = HashSet::new();
        entries.retain(|e| seen_names.insert(e.name.clone()));

        self.add_level(entries);
        self.discovery = DiscoveryMode::Incremental;
        self.sync_stale_opens();
    }

    /// Looks up a single mailbox by name.
    pub fn get(&mut self, name: &str) -> Option<NodeView> {
        let id = self.store.convert_name(name);
        let view = self.view(&id);
        self.sync_stale_opens();
        view
    }

    /// Inserts mailboxes into the tree, synthesizing any missing ancestors.
    /// Already-present paths are left untouched. Refused entirely in news
    /// mode, where the hierarchy is not the user's to extend.
    pub fn insert<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.config.mode == TreeMode::News {
            return false;
        }

        let mut paths: Vec<String> =
            names.into_iter().map(|n| self.store.convert_name(n.as_ref())).collect();
        self.store.sort_paths(&mut paths);

        // Decompose each path into its ancestor chain, shallow first.
        let mut pending: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for path in &paths {
            let ns = self.store.namespace_for(path);
            let delimiter = ns.delimiter.to_string();
            let parts: Vec<String> = path.split(ns.delimiter).map(String::from).collect();
            for depth in 0..parts.len() {
                let id = parts[..=depth].join(&delimiter);
                if seen.insert(id.clone()) {
                    pending.push(id);
                }
            }
        }

        for id in pending {
            if self.store.contains(&id) {
                continue;
            }
            let entry = self
                .list_or_empty(&id)
                .into_iter()
                .next()
                // Not listed by the provider: a purely structural ancestor.
                .unwrap_or_else(|| MailboxEntry {
                    name: id.clone(),
                    selectable: false,
                    children: ChildrenHint::Unknown,
                    namespace_boundary: false,
                });
            let node = self.make_element(&entry);
            let parent = node.parent.clone();
            let subscribed = node.attrs.contains(Attr::IS_SUBSCRIBED);
            if self.store.insert_element(node) {
                self.store.note_child_added(parent.as_deref());
                self.store.record_membership(&id, subscribed);
            }
        }

        self.sync_stale_opens();
        true
    }

    /// Deletes mailboxes, deepest first. A mailbox that still has children is
    /// converted to a container instead of removed; emptied container
    /// ancestors are cleaned up. `INBOX` and namespace placeholders are
    /// refused. Returns `false` when any entry could not be processed.
    pub fn delete<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths: Vec<String> =
            names.into_iter().map(|n| self.store.convert_name(n.as_ref())).collect();
        self.store.sort_paths(&mut paths);
        paths.reverse();

        let mut success = true;
        for id in paths {
            if !self.delete_one(&id) {
                success = false;
            }
        }
        self.sync_stale_opens();
        success
    }

    fn delete_one(&mut self, id: &str) -> bool {
        use crate::store::DeleteOutcome;
        match self.store.delete(id) {
            DeleteOutcome::Refused => false,
            DeleteOutcome::Converted(_) => true,
            DeleteOutcome::Removed { removed, closed } => {
                for rid in &removed {
                    self.forget_open(rid);
                    self.forget_poll(rid);
                }
                for cid in &closed {
                    self.forget_open(cid);
                }
                true
            }
        }
    }

    /// Marks mailboxes subscribed, inserting any that are not in the tree
    /// yet.
    pub fn subscribe<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ok = true;
        for name in names {
            let id = self.store.convert_name(name.as_ref());
            if self.store.contains(&id) {
                self.store.set_subscribed(&id, true);
                self.store.set_container(&id, false);
            } else if !self.insert([id]) {
                ok = false;
            }
        }
        self.sync_stale_opens();
        ok
    }

    /// Marks mailboxes unsubscribed, deepest first. `INBOX` is immune. In
    /// subscribed-only view a node with children becomes a container so the
    /// branch stays reachable.
    pub fn unsubscribe<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths: Vec<String> =
            names.into_iter().map(|n| self.store.convert_name(n.as_ref())).collect();
        self.store.sort_paths(&mut paths);
        paths.reverse();

        let mut any = false;
        for id in paths {
            if id == "INBOX" || !self.store.contains(&id) {
                continue;
            }
            if !self.store.show_unsub && self.store.has_children(&id) {
                self.store.set_container(&id, true);
            }
            self.store.set_subscribed(&id, false);
            any = true;
        }
        self.sync_stale_opens();
        any
    }

    /// Switches the unsubscribed-mailbox view on or off. Switching it on
    /// merges every known unsubscribed mailbox into the tree.
    pub fn show_unsubscribed(&mut self, show: bool) {
        if show == self.store.show_unsub {
            return;
        }
        self.store.show_unsub = show;
        self.store.changed = true;
        // Visibility scans depend on the toggle.
        self.store.clear_children_cache();
        if !show || self.store.unsub_view {
            // Off, or the unsubscribed entries were merged earlier this
            // session and are still in the store.
            return;
        }

        self.store.unsub_view = true;
        self.ensure_unsubscribed();
        let unsubscribed = self.store.unsubscribed_vec();
        if unsubscribed.is_empty() {
            return;
        }
        // Bulk merge: nodes appear closed (or per initial_expand) and open
        // state is not persisted.
        let previous = std::mem::replace(&mut self.discovery, DiscoveryMode::Bulk {
            fetch_all: false,
        });
        self.insert(unsubscribed);
        self.discovery = previous;
    }

    /// Declares whether the backend's children hints are meaningful.
    /// `Some(false)` forces membership scans; `None` trusts whatever hints
    /// individual entries carry.
    pub fn hint_support(&mut self, support: Option<bool>) {
        self.store.set_hint_support(support);
    }

    /// Adds mailboxes to the poll list. Containers cannot be polled.
    pub fn add_poll<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_poll();
        for name in names {
            let id = self.store.convert_name(name.as_ref());
            if !self.store.contains(&id) || self.store.is_container(&id) {
                continue;
            }
            if let Some(poll) = self.poll.as_mut() {
                poll.insert(id.clone());
            }
            if let Some(store) = self.poll_list.as_mut() {
                store.add(&id);
            }
            self.store.set_polled(&id, true);
        }
    }

    /// Removes mailboxes from the poll list. `INBOX` is always polled in
    /// mail mode and cannot be removed.
    pub fn remove_poll<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_poll();
        for name in names {
            let id = self.store.convert_name(name.as_ref());
            if self.config.mode == TreeMode::Mail && id == "INBOX" {
                continue;
            }
            if let Some(poll) = self.poll.as_mut() {
                poll.remove(&id);
            }
            if let Some(store) = self.poll_list.as_mut() {
                store.remove(&id);
            }
            self.store.set_polled(&id, false);
        }
    }

    pub fn is_polled(&mut self, name: &str) -> bool {
        let id = self.store.convert_name(name);
        self.ensure_poll();
        self.poll.as_ref().is_some_and(|p| p.contains(&id))
    }

    /// Builds a tree node from a directory entry: canonical name, namespace-
    /// relative depth, parent linkage, and seeded state.
    pub(crate) fn make_element(&mut self, entry: &MailboxEntry) -> Node {
        let name = self.store.convert_name(&entry.name);
        let ns = self.store.namespace_for(&name);
        let delimiter = ns.delimiter;
        let parts: Vec<&str> = name.split(delimiter).collect();

        let mut depth = parts.len() - 1;
        let label = utf7_imap::decode_utf7_imap(parts[depth].to_string());
        let joiner = delimiter.to_string();
        let mut parent =
            if depth == 0 { None } else { Some(parts[..depth].join(&joiner)) };

        // Inside a prefixed personal namespace the prefix does not count as
        // a level: its direct children sit at the root (or under INBOX when
        // the prefix nests the inbox itself).
        if depth > 0
            && ns.kind == crate::namespace::NamespaceKind::Personal
            && !ns.prefix.is_empty()
        {
            depth -= 1;
            if let Some(p) = parent.as_deref() {
                if !p.contains(delimiter) {
                    parent = None;
                } else if name.starts_with(&format!("{}INBOX{}", ns.prefix, delimiter)) {
                    parent = Some("INBOX".to_string());
                }
            }
        }

        let mut attrs = Attr::empty();
        if !entry.selectable {
            attrs |= Attr::NO_SELECT;
        }
        if entry.namespace_boundary {
            attrs |= Attr::IS_NAMESPACE;
        }

        self.ensure_subscribed();
        if self.store.subscribed_contains(&name) {
            attrs |= Attr::IS_SUBSCRIBED;
        }

        self.ensure_poll();
        if self.poll.as_ref().is_some_and(|p| p.contains(&name)) {
            attrs |= Attr::IS_POLLED;
        }

        // New nodes start closed outside bulk initialization.
        if matches!(self.discovery, DiscoveryMode::Bulk { .. }) && self.initial_open(&name) {
            attrs |= Attr::IS_OPEN;
        }

        Node { id: name, label, depth, parent, attrs, hint: entry.children }
    }

    /// Evaluates a freshly created node's open state during bulk merges.
    pub(crate) fn initial_open(&mut self, id: &str) -> bool {
        match self.config.initial_expand {
            InitialExpand::None => false,
            InitialExpand::All => true,
            InitialExpand::User => self.expanded_contains(id),
        }
    }

    pub(crate) fn expanded_contains(&mut self, id: &str) -> bool {
        self.ensure_expanded();
        self.expanded.as_ref().is_some_and(|set| set.contains(id))
    }

    pub(crate) fn ensure_expanded(&mut self) {
        if self.expanded.is_some() {
            return;
        }
        let set = match self.open_folders.as_mut() {
            Some(store) => store.initialize(),
            None => HashSet::new(),
        };
        self.expanded = Some(set);
    }

    fn ensure_poll(&mut self) {
        if self.poll.is_some() {
            return;
        }
        let mut set = match self.poll_list.as_mut() {
            Some(store) => store.get(),
            None => HashSet::new(),
        };
        if self.config.mode == TreeMode::Mail {
            set.insert("INBOX".to_string());
        }
        self.poll = Some(set);
    }

    /// Builds the subscribed-name set from the provider, once per session.
    /// In mail mode `INBOX` is always treated as subscribed.
    pub(crate) fn ensure_subscribed(&mut self) {
        if self.store.has_subscribed_list() {
            return;
        }
        let mut set = HashSet::new();
        if self.config.mode == TreeMode::Mail {
            set.insert("INBOX".to_string());
        }
        let mut seen = HashSet::new();
        for ns in self.store.namespaces_vec() {
            let pattern = format!("{}*", ns.prefix);
            if !seen.insert(pattern.clone()) {
                continue;
            }
            match self.provider.list_subscribed(&pattern) {
                Ok(names) => {
                    for name in names {
                        set.insert(self.store.convert_name(&name));
                    }
                }
                Err(err) => log::warn!("subscription listing for {pattern:?} failed: {err}"),
            }
        }
        self.store.set_subscribed_list(set);
    }

    /// Builds the unsubscribed-name set (everything minus the subscribed
    /// set), once per session.
    pub(crate) fn ensure_unsubscribed(&mut self) {
        if self.store.has_unsubscribed_list() {
            return;
        }
        self.ensure_subscribed();
        let mut all = HashSet::new();
        let mut seen = HashSet::new();
        for ns in self.store.namespaces_vec() {
            let pattern = format!("{}*", ns.prefix);
            if !seen.insert(pattern.clone()) {
                continue;
            }
            match self.provider.list_all(&pattern) {
                Ok(names) => {
                    for name in names {
                        all.insert(self.store.convert_name(&name));
                    }
                }
                Err(err) => log::warn!("mailbox listing for {pattern:?} failed: {err}"),
            }
        }
        let unsubscribed: HashSet<String> =
            all.into_iter().filter(|name| !self.store.subscribed_contains(name)).collect();
        self.store.set_unsubscribed_list(unsubscribed);
    }

    /// Lists from the provider, degrading a failure to an empty result.
    pub(crate) fn list_or_empty(&mut self, pattern: &str) -> Vec<MailboxEntry> {
        match self.provider.list(pattern) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("directory listing for {pattern:?} failed: {err}");
                Vec::new()
            }
        }
    }

    /// Resolves a node into its public view.
    pub(crate) fn view(&mut self, id: &str) -> Option<NodeView> {
        let node = self.store.node(id)?.clone();
        Some(NodeView {
            id: node.id,
            label: node.label,
            depth: node.depth,
            parent: node.parent,
            has_children: self.store.has_children(id),
            is_container: self.store.is_container(id),
            is_open: self.store.is_open(id),
            is_subscribed: node.attrs.contains(Attr::IS_SUBSCRIBED),
            is_discovered: node.attrs.contains(Attr::IS_DISCOVERED),
            is_polled: node.attrs.contains(Attr::IS_POLLED),
            is_namespace: node.attrs.contains(Attr::IS_NAMESPACE),
        })
    }

    /// Whether a node belongs in the current view: everything when showing
    /// unsubscribed entries except childless namespace placeholders,
    /// otherwise subscribed non-containers and nodes kept alive by visible
    /// descendants.
    pub(crate) fn visible(&mut self, id: &str) -> bool {
        if self.store.show_unsub {
            // A namespace placeholder earns its place through content.
            if self.store.is_namespace(id) {
                return self.store.has_children(id);
            }
            return true;
        }
        (self.store.is_subscribed(id) && !self.store.is_container(id))
            || self.store.has_children(id)
    }

    fn forget_open(&mut self, id: &str) {
        if let Some(set) = self.expanded.as_mut() {
            set.remove(id);
        }
        if let Some(store) = self.open_folders.as_mut() {
            store.remove(id);
        }
    }

    fn forget_poll(&mut self, id: &str) {
        if self.config.mode == TreeMode::Mail && id == "INBOX" {
            return;
        }
        if let Some(set) = self.poll.as_mut() {
            set.remove(id);
        }
        if let Some(store) = self.poll_list.as_mut() {
            store.remove(id);
        }
    }

    /// Propagates open-state corrections discovered mid-operation to the
    /// persistence collaborator.
    pub(crate) fn sync_stale_opens(&mut self) {
        for id in self.store.take_stale_opens() {
            self.forget_open(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::NamespaceKind;
    use crate::provider::{MemoryDirectory, MemoryOpenFolders, MemoryPollList};

    fn make_tree(dir: &MemoryDirectory) -> MailboxTree {
        MailboxTree::new(TreeConfig::default(), Box::new(dir.clone()))
    }

    fn make_dir(boxes: &[&str], subscribed: &[&str]) -> MemoryDirectory {
        let dir = MemoryDirectory::new('/');
        for name in boxes {
            dir.add(name);
        }
        for name in subscribed {
            dir.subscribe(name);
        }
        dir
    }

    #[test]
    fn initialize_always_contains_inbox_in_mail_mode() {
        let dir = make_dir(&["Archive"], &["Archive"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());

        let inbox = tree.get("INBOX").unwrap();
        assert_eq!(inbox.depth, 0);
        assert!(inbox.is_subscribed);
    }

    #[test]
    fn inbox_lookup_is_case_insensitive_in_mail_mode() {
        let dir = make_dir(&["INBOX"], &["INBOX"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());
        assert_eq!(tree.get("inbox").unwrap().id, "INBOX");
    }

    #[test]
    fn insert_creates_node_and_updates_parent() {
        let dir = make_dir(&["INBOX", "INBOX/Sent"], &["INBOX", "INBOX/Sent"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());

        assert!(tree.insert(["INBOX/Sent"]));

        let sent = tree.get("INBOX/Sent").unwrap();
        assert_eq!(sent.depth, 1);
        assert_eq!(sent.parent.as_deref(), Some("INBOX"));
        assert!(tree.get("INBOX").unwrap().has_children);
    }

    #[test]
    fn insert_synthesizes_missing_ancestors_as_containers() {
        let dir = make_dir(&["INBOX"], &["INBOX"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());

        assert!(tree.insert(["Projects/2026/Q1"]));

        let projects = tree.get("Projects").unwrap();
        assert!(projects.is_container);
        let q1 = tree.get("Projects/2026/Q1").unwrap();
        assert_eq!(q1.depth, 2);
        assert_eq!(q1.parent.as_deref(), Some("Projects/2026"));
    }

    #[test]
    fn insert_is_idempotent() {
        let dir = make_dir(&["INBOX", "INBOX/Sent"], &["INBOX", "INBOX/Sent"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());

        assert!(tree.insert(["INBOX/Sent"]));
        tree.diff_start();
        assert!(tree.insert(["INBOX/Sent"]));
        assert!(tree.diff().is_none());
    }

    #[test]
    fn insert_refused_in_news_mode() {
        let dir = MemoryDirectory::new('.');
        dir.add("comp.lang.misc");
        dir.subscribe("comp.lang.misc");
        let config = TreeConfig { mode: TreeMode::News, default_delimiter: '.', ..TreeConfig::default() };
        let mut tree = MailboxTree::new(config, Box::new(dir.clone()));
        tree.initialize(InitOptions::default());

        assert!(!tree.insert(["alt.test"]));
        assert!(tree.get("alt.test").is_none());
    }

    #[test]
    fn delete_refuses_inbox() {
        let dir = make_dir(&["INBOX"], &["INBOX"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());

        assert!(!tree.delete(["INBOX"]));
        assert!(tree.get("INBOX").is_some());
    }

    #[test]
    fn empty_delete_batch_vacuously_succeeds() {
        let dir = make_dir(&["INBOX"], &["INBOX"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());

        let none: [&str; 0] = [];
        assert!(tree.delete(none));
    }

    #[test]
    fn delete_converts_populated_mailbox_to_container() {
        let dir = make_dir(
            &["INBOX", "INBOX/Work", "INBOX/Work/Sub"],
            &["INBOX", "INBOX/Work", "INBOX/Work/Sub"],
        );
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions { fetch_all: true, ..InitOptions::default() });

        assert!(tree.delete(["INBOX/Work"]));
        let work = tree.get("INBOX/Work").unwrap();
        assert!(work.is_container);
        assert!(tree.get("INBOX/Work/Sub").is_some());
    }

    #[test]
    fn delete_cleans_up_emptied_ancestors_and_persistence() {
        let dir = make_dir(&["INBOX", "Work/Sub"], &["INBOX", "Work/Sub"]);
        dir.add_entry(MailboxEntry {
            name: "Work".to_string(),
            selectable: false,
            children: ChildrenHint::Unknown,
            namespace_boundary: false,
        });
        let open = MemoryOpenFolders::new();
        let poll = MemoryPollList::new();
        poll.insert("Work/Sub");
        let mut tree = make_tree(&dir)
            .with_open_folder_store(Box::new(open.clone()))
            .with_poll_list_store(Box::new(poll.clone()));
        tree.initialize(InitOptions::default());
        tree.insert(["Work/Sub"]);

        // Work is a non-selectable container holding a single child.
        assert!(tree.get("Work").unwrap().is_container);
        assert!(tree.delete(["Work/Sub"]));
        assert!(tree.get("Work/Sub").is_none());
        assert!(tree.get("Work").is_none());
        assert!(!poll.contains("Work/Sub"));
    }

    #[test]
    fn unsubscribe_with_children_becomes_container() {
        let dir = make_dir(
            &["INBOX", "INBOX/Work", "INBOX/Work/Sub"],
            &["INBOX", "INBOX/Work", "INBOX/Work/Sub"],
        );
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions { fetch_all: true, ..InitOptions::default() });

        assert!(tree.unsubscribe(["INBOX/Work"]));
        let work = tree.get("INBOX/Work").unwrap();
        assert!(!work.is_subscribed);
        assert!(work.is_container);
        assert!(tree.get("INBOX/Work/Sub").is_some());
    }

    #[test]
    fn unsubscribe_cannot_touch_inbox() {
        let dir = make_dir(&["INBOX"], &["INBOX"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());

        assert!(!tree.unsubscribe(["INBOX"]));
        assert!(tree.get("INBOX").unwrap().is_subscribed);
    }

    #[test]
    fn subscribe_inserts_missing_mailboxes() {
        let dir = make_dir(&["INBOX", "Archive"], &["INBOX"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());
        assert!(tree.get("Archive").is_none());

        assert!(tree.subscribe(["Archive"]));
        assert!(tree.get("Archive").is_some());
    }

    #[test]
    fn subscribe_clears_container_status() {
        let dir = make_dir(
            &["INBOX", "INBOX/Work", "INBOX/Work/Sub"],
            &["INBOX", "INBOX/Work", "INBOX/Work/Sub"],
        );
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions { fetch_all: true, ..InitOptions::default() });

        tree.unsubscribe(["INBOX/Work"]);
        assert!(tree.get("INBOX/Work").unwrap().is_container);
        tree.subscribe(["INBOX/Work"]);
        let work = tree.get("INBOX/Work").unwrap();
        assert!(work.is_subscribed);
        assert!(!work.is_container);
    }

    #[test]
    fn show_unsubscribed_merges_known_mailboxes() {
        let dir = make_dir(&["INBOX", "Archive"], &["INBOX"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());
        assert!(tree.get("Archive").is_none());

        tree.show_unsubscribed(true);
        let archive = tree.get("Archive").unwrap();
        assert!(!archive.is_subscribed);
        assert!(!archive.is_open);
    }

    #[test]
    fn namespace_placeholders_are_seeded_and_protected() {
        let config = TreeConfig {
            namespaces: vec![Namespace {
                prefix: "Other Users/".to_string(),
                delimiter: '/',
                kind: NamespaceKind::Other,
            }],
            ..TreeConfig::default()
        };
        let dir = make_dir(&["INBOX", "Other Users/jane"], &["INBOX", "Other Users/jane"]);
        let mut tree = MailboxTree::new(config, Box::new(dir.clone()));
        tree.initialize(InitOptions::default());

        let placeholder = tree.get("Other Users").unwrap();
        assert!(placeholder.is_namespace);
        assert!(placeholder.is_container);
        assert!(!tree.delete(["Other Users"]));
    }

    #[test]
    fn personal_prefix_does_not_count_as_a_level() {
        let config = TreeConfig {
            namespaces: vec![Namespace {
                prefix: "INBOX/".to_string(),
                delimiter: '/',
                kind: NamespaceKind::Personal,
            }],
            ..TreeConfig::default()
        };
        let dir = make_dir(&["INBOX", "INBOX/Sent"], &["INBOX", "INBOX/Sent"]);
        let mut tree = MailboxTree::new(config, Box::new(dir.clone()));
        tree.initialize(InitOptions { fetch_all: true, ..InitOptions::default() });

        let sent = tree.get("INBOX/Sent").unwrap();
        assert_eq!(sent.depth, 0);
        assert_eq!(sent.parent, None);
    }

    #[test]
    fn poll_list_always_contains_inbox() {
        let dir = make_dir(&["INBOX", "Archive"], &["INBOX", "Archive"]);
        let poll = MemoryPollList::new();
        let mut tree = make_tree(&dir).with_poll_list_store(Box::new(poll.clone()));
        tree.initialize(InitOptions::default());

        assert!(tree.is_polled("INBOX"));
        tree.remove_poll(["INBOX"]);
        assert!(tree.is_polled("INBOX"));

        tree.insert(["Archive"]);
        tree.add_poll(["Archive"]);
        assert!(tree.is_polled("Archive"));
        assert!(poll.contains("Archive"));
        tree.remove_poll(["Archive"]);
        assert!(!tree.is_polled("Archive"));
        assert!(!poll.contains("Archive"));
    }

    #[test]
    fn dot_folders_are_filtered_by_default() {
        let dir = make_dir(&["INBOX", ".hidden"], &["INBOX", ".hidden"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions { show_unsubscribed: true, ..InitOptions::default() });
        assert!(tree.get(".hidden").is_none());

        let config = TreeConfig { show_dotfiles: true, ..TreeConfig::default() };
        let mut tree = MailboxTree::new(config, Box::new(dir.clone()));
        tree.initialize(InitOptions { show_unsubscribed: true, ..InitOptions::default() });
        assert!(tree.get(".hidden").is_some());
    }

    #[test]
    fn provider_failure_degrades_to_empty_tree() {
        let dir = make_dir(&["INBOX"], &["INBOX"]);
        dir.fail_listings(true);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());

        // INBOX is still synthesized; nothing else survives the failure.
        assert!(tree.get("INBOX").is_some());
        assert!(tree.get("Archive").is_none());
    }

    #[test]
    fn diff_tracks_structural_changes() {
        let dir = make_dir(&["INBOX", "INBOX/Sent"], &["INBOX", "INBOX/Sent"]);
        let mut tree = make_tree(&dir);
        tree.initialize(InitOptions::default());

        tree.diff_start();
        tree.insert(["INBOX/Sent"]);
        let diff = tree.diff().unwrap();
        assert_eq!(diff.added, ["INBOX/Sent"]);
        // INBOX picked up a children hint when Sent was attached.
        assert_eq!(diff.changed, ["INBOX"]);
        assert!(diff.removed.is_empty());

        tree.diff_start();
        tree.unsubscribe(["INBOX/Sent"]);
        let diff = tree.diff().unwrap();
        assert!(diff.added.is_empty());
        assert_eq!(diff.changed, ["INBOX/Sent"]);
    }
}
