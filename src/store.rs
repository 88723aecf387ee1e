//! Node storage and structural mutation primitives.
//!
//! The store owns the node table, the parent→children index, the subscription
//! membership sets and the `has_children` cache. It knows nothing about the
//! directory provider: discovery and persistence live in the facade, which
//! feeds the store plain nodes and reacts to the structured outcomes returned
//! here.

use std::collections::{HashMap, HashSet};

use crate::namespace::{Namespace, NamespaceRegistry};
use crate::provider::ChildrenHint;
use crate::sort::NameComparator;
use crate::types::TreeMode;

bitflags::bitflags! {
    /// Per-node attribute set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct Attr: u16 {
        /// Cannot hold messages; rendered as a container.
        const NO_SELECT = 1 << 0;
        /// Placeholder for a namespace boundary.
        const IS_NAMESPACE = 1 << 1;
        /// Expanded in the current view.
        const IS_OPEN = 1 << 2;
        const IS_SUBSCRIBED = 1 << 3;
        /// Children have been fetched from the provider.
        const IS_DISCOVERED = 1 << 4;
        /// Checked for new mail.
        const IS_POLLED = 1 << 5;
        /// The child list is out of order and must be sorted before use.
        const NEEDS_SORT = 1 << 6;
    }
}

/// A single tree node. `parent == None` means the (implicit) root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Node {
    pub id: String,
    pub label: String,
    pub depth: usize,
    pub parent: Option<String>,
    pub attrs: Attr,
    pub hint: ChildrenHint,
}

/// Result of a single-node delete.
pub(crate) enum DeleteOutcome {
    /// Unknown id, `INBOX`, or a namespace placeholder.
    Refused,
    /// The node still has children and was converted to a container instead.
    Converted(String),
    /// Nodes actually removed, plus ancestors whose open state was cleared
    /// because they ended up childless.
    Removed { removed: Vec<String>, closed: Vec<String> },
}

#[derive(Debug)]
pub(crate) struct TreeStore {
    mode: TreeMode,
    show_dotfiles: bool,
    registry: NamespaceRegistry,
    comparator: NameComparator,
    nodes: HashMap<String, Node>,
    root_children: Vec<String>,
    root_attrs: Attr,
    children: HashMap<String, Vec<String>>,
    /// Whether unsubscribed entries are part of the current view.
    pub show_unsub: bool,
    /// Set once unsubscribed entries have ever been loaded this session.
    pub unsub_view: bool,
    subscribed: Option<HashSet<String>>,
    unsubscribed: Option<HashSet<String>>,
    children_cache: HashMap<String, bool>,
    hint_support: Option<bool>,
    /// Nodes whose persisted open state turned out stale; drained by the
    /// facade after every public operation.
    stale_opens: Vec<String>,
    /// Set by every mutation; gates diff reporting.
    pub changed: bool,
}

impl TreeStore {
    pub fn new(
        mode: TreeMode,
        namespaces: Vec<Namespace>,
        default_delimiter: char,
        show_dotfiles: bool,
    ) -> Self {
        Self {
            mode,
            show_dotfiles,
            registry: NamespaceRegistry::new(namespaces, default_delimiter),
            comparator: NameComparator::new(default_delimiter),
            nodes: HashMap::new(),
            root_children: Vec::new(),
            root_attrs: Attr::IS_DISCOVERED,
            children: HashMap::new(),
            show_unsub: false,
            unsub_view: false,
            subscribed: None,
            unsubscribed: None,
            children_cache: HashMap::new(),
            hint_support: None,
            stale_opens: Vec::new(),
            changed: true,
        }
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[inline]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn nodes_table(&self) -> &HashMap<String, Node> {
        &self.nodes
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn children_of(&self, parent: Option<&str>) -> &[String] {
        match parent {
            None => &self.root_children,
            Some(p) => self.children.get(p).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Canonicalizes a mailbox name: in mail mode `INBOX` is case-normalized.
    pub fn convert_name(&self, name: &str) -> String {
        if self.mode == TreeMode::Mail && name.eq_ignore_ascii_case("INBOX") {
            "INBOX".to_string()
        } else {
            name.to_string()
        }
    }

    pub fn namespace_for(&mut self, path: &str) -> Namespace {
        self.registry.resolve(path)
    }

    pub fn namespaces_vec(&self) -> Vec<Namespace> {
        self.registry.namespaces().to_vec()
    }

    /// Inserts a prepared node. Rejects empty labels, hidden dot-folders, and
    /// ids that already exist as non-containers. Re-inserting over a
    /// container replaces it in place, keeping its position and children.
    pub fn insert_element(&mut self, node: Node) -> bool {
        if node.label.is_empty() {
            return false;
        }
        if !self.show_dotfiles && node.label.starts_with('.') {
            return false;
        }
        let exists = self.nodes.contains_key(&node.id);
        if exists && !self.is_container(&node.id) {
            return false;
        }

        let id = node.id.clone();
        if !exists {
            match &node.parent {
                None => self.root_children.push(id.clone()),
                Some(p) => self.children.entry(p.clone()).or_default().push(id.clone()),
            }
        }
        self.nodes.insert(id.clone(), node);
        self.invalidate_children(&id);
        self.changed = true;
        true
    }

    /// Bookkeeping after a child was attached to `parent`: the parent now
    /// provably has children, and its list needs sorting once it holds more
    /// than one entry.
    pub fn note_child_added(&mut self, parent: Option<&str>) {
        if let Some(p) = parent {
            if let Some(node) = self.nodes.get_mut(p) {
                node.hint = ChildrenHint::Has;
            }
            let p = p.to_string();
            self.invalidate_children(&p);
        }
        if self.children_of(parent).len() > 1 {
            self.set_needs_sort(parent, true);
        }
    }

    /// Deletes one node. A node that still has children is converted to a
    /// container instead; removing the last child of a container cascades the
    /// cleanup upward.
    pub fn delete(&mut self, id: &str) -> DeleteOutcome {
        let Some(node) = self.nodes.get(id) else {
            return DeleteOutcome::Refused;
        };
        if id == "INBOX" || node.attrs.contains(Attr::IS_NAMESPACE) {
            return DeleteOutcome::Refused;
        }
        let ns = self.registry.resolve(id);
        if !ns.prefix.is_empty() && id == ns.placeholder_name() {
            return DeleteOutcome::Refused;
        }

        self.changed = true;

        if self.has_children(id) {
            log::debug!("{id:?} still has children, converting to container");
            self.set_container(id, true);
            return DeleteOutcome::Converted(id.to_string());
        }

        let parent = self.nodes.get(id).and_then(|n| n.parent.clone());
        self.nodes.remove(id);
        if let Some(s) = self.subscribed.as_mut() {
            s.remove(id);
        }
        if let Some(u) = self.unsubscribed.as_mut() {
            u.remove(id);
        }
        match parent.as_deref() {
            None => self.root_children.retain(|c| c != id),
            Some(p) => {
                if let Some(list) = self.children.get_mut(p) {
                    list.retain(|c| c != id);
                }
            }
        }
        self.invalidate_children(id);

        let mut removed = vec![id.to_string()];
        let mut closed = Vec::new();

        if self.children_of(parent.as_deref()).is_empty() {
            if let Some(p) = parent.as_deref() {
                self.children.remove(p);
                if self.nodes.contains_key(p) {
                    self.set_hint(p, ChildrenHint::Unknown);
                    let p = p.to_string();
                    self.invalidate_children(&p);
                    if self.is_container(&p) && !self.is_namespace(&p) {
                        // An empty container has no reason to stay.
                        if let DeleteOutcome::Removed { removed: r, closed: c } = self.delete(&p) {
                            removed.extend(r);
                            closed.extend(c);
                        }
                    } else if !self.has_children(&p) {
                        self.set_hint(&p, ChildrenHint::HasNone);
                        closed.push(p.clone());
                        if let Some(pn) = self.nodes.get_mut(&p) {
                            pn.attrs.remove(Attr::IS_OPEN);
                        }
                    }
                }
            }
        }

        DeleteOutcome::Removed { removed, closed }
    }

    /// Tri-state children resolution.
    ///
    /// Hints are authoritative when the embedder declared backend support,
    /// or when support is undeclared and the hint is set. With declared
    /// support an unset hint counts as no children. Everything else falls
    /// back to a prefix scan of the subscription membership lists, cached
    /// per node.
    pub fn has_children(&mut self, id: &str) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let is_namespace = node.attrs.contains(Attr::IS_NAMESPACE);
        let hint = node.hint;

        let authoritative = !is_namespace
            && match self.hint_support {
                Some(support) => support,
                None => hint != ChildrenHint::Unknown,
            };
        if authoritative {
            if hint != ChildrenHint::Has {
                if self.show_unsub {
                    self.clear_stale_open(id);
                }
                return false;
            }
            if self.show_unsub {
                return true;
            }
            // Subscribed-only view: the hint alone cannot prove a visible
            // descendant exists, confirm via the membership lists below.
        }

        if let Some(&cached) = self.children_cache.get(id) {
            return cached;
        }

        let ns = self.registry.resolve(id);
        let mut search = format!("{id}{}", ns.delimiter);
        if id == "INBOX" && ns.prefix == format!("INBOX{}", ns.delimiter) {
            search.push_str(&ns.prefix);
        }

        let found = contains_prefix(self.subscribed.as_ref(), &search)
            || (self.show_unsub && contains_prefix(self.unsubscribed.as_ref(), &search));

        if !found && is_namespace && self.show_unsub {
            self.clear_stale_open(id);
        }

        self.children_cache.insert(id.to_string(), found);
        found
    }

    fn clear_stale_open(&mut self, id: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            if node.attrs.contains(Attr::IS_OPEN) {
                node.attrs.remove(Attr::IS_OPEN);
                self.stale_opens.push(id.to_string());
                self.changed = true;
            }
        }
    }

    /// A container cannot hold messages. Non-selectable nodes always are;
    /// in subscribed-only view, unsubscribed nodes kept alive by subscribed
    /// descendants render as containers too.
    pub fn is_container(&mut self, id: &str) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if node.attrs.contains(Attr::NO_SELECT) {
            return true;
        }
        if self.show_unsub || node.attrs.contains(Attr::IS_SUBSCRIBED) {
            return false;
        }
        self.has_children(id)
    }

    /// Open means expanded *and* still having children.
    pub fn is_open(&mut self, id: &str) -> bool {
        self.attr(id, Attr::IS_OPEN) && self.has_children(id)
    }

    #[inline]
    fn attr(&self, id: &str, flag: Attr) -> bool {
        self.nodes.get(id).is_some_and(|n| n.attrs.contains(flag))
    }

    #[inline]
    pub fn is_subscribed(&self, id: &str) -> bool {
        self.attr(id, Attr::IS_SUBSCRIBED)
    }

    #[inline]
    pub fn is_namespace(&self, id: &str) -> bool {
        self.attr(id, Attr::IS_NAMESPACE)
    }

    #[inline]
    pub fn is_discovered(&self, id: &str) -> bool {
        self.attr(id, Attr::IS_DISCOVERED)
    }

    pub fn set_open(&mut self, id: &str, value: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attrs.set(Attr::IS_OPEN, value);
            self.changed = true;
        }
    }

    pub fn set_container(&mut self, id: &str, value: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attrs.set(Attr::NO_SELECT, value);
            self.changed = true;
        }
    }

    pub fn set_polled(&mut self, id: &str, value: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attrs.set(Attr::IS_POLLED, value);
            self.changed = true;
        }
    }

    pub fn set_subscribed(&mut self, id: &str, value: bool) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.attrs.set(Attr::IS_SUBSCRIBED, value);
        if value {
            if let Some(s) = self.subscribed.as_mut() {
                s.insert(id.to_string());
            }
            if let Some(u) = self.unsubscribed.as_mut() {
                u.remove(id);
            }
        } else {
            if let Some(u) = self.unsubscribed.as_mut() {
                u.insert(id.to_string());
            }
            if let Some(s) = self.subscribed.as_mut() {
                s.remove(id);
            }
        }
        self.invalidate_children(id);
        self.changed = true;
    }

    pub fn set_discovered(&mut self, parent: Option<&str>, value: bool) {
        match parent {
            None => self.root_attrs.set(Attr::IS_DISCOVERED, value),
            Some(p) => {
                if let Some(node) = self.nodes.get_mut(p) {
                    node.attrs.set(Attr::IS_DISCOVERED, value);
                }
            }
        }
    }

    pub fn needs_sort(&self, parent: Option<&str>) -> bool {
        match parent {
            None => self.root_attrs.contains(Attr::NEEDS_SORT),
            Some(p) => self.attr(p, Attr::NEEDS_SORT),
        }
    }

    pub fn set_needs_sort(&mut self, parent: Option<&str>, value: bool) {
        match parent {
            None => self.root_attrs.set(Attr::NEEDS_SORT, value),
            Some(p) => {
                if let Some(node) = self.nodes.get_mut(p) {
                    node.attrs.set(Attr::NEEDS_SORT, value);
                }
            }
        }
    }

    pub fn set_hint(&mut self, id: &str, hint: ChildrenHint) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.hint = hint;
        }
    }

    pub fn set_hint_support(&mut self, support: Option<bool>) {
        self.hint_support = support;
        self.children_cache.clear();
    }

    /// Sorts `parent`'s child list in place and clears its sort flag.
    pub fn sort_children(&mut self, parent: Option<&str>) {
        let pin_inbox = self.mode == TreeMode::Mail;
        let comparator = self.comparator;
        let mut list = match parent {
            None => std::mem::take(&mut self.root_children),
            Some(p) => self.children.remove(p).unwrap_or_default(),
        };
        list.sort_by(|a, b| comparator.compare(a, b, pin_inbox));
        match parent {
            None => self.root_children = list,
            Some(p) => {
                self.children.insert(p.to_string(), list);
            }
        }
        self.set_needs_sort(parent, false);
        self.changed = true;
    }

    /// Sorts a flat list of full paths shallow-first.
    pub fn sort_paths(&self, list: &mut [String]) {
        let pin_inbox = self.mode == TreeMode::Mail;
        self.comparator.sort(list, pin_inbox);
    }

    /// Drops the cached `has_children` result for `id` and every ancestor.
    pub fn invalidate_children(&mut self, id: &str) {
        self.children_cache.remove(id);
        let delimiter = self.registry.resolve(id).delimiter;
        let mut rest = id;
        while let Some(ix) = rest.rfind(delimiter) {
            rest = &rest[..ix];
            self.children_cache.remove(rest);
        }
    }

    pub fn clear_children_cache(&mut self) {
        self.children_cache.clear();
    }

    pub fn take_stale_opens(&mut self) -> Vec<String> {
        std::mem::take(&mut self.stale_opens)
    }

    pub fn has_subscribed_list(&self) -> bool {
        self.subscribed.is_some()
    }

    pub fn has_unsubscribed_list(&self) -> bool {
        self.unsubscribed.is_some()
    }

    pub fn set_subscribed_list(&mut self, list: HashSet<String>) {
        self.subscribed = Some(list);
        self.children_cache.clear();
        self.changed = true;
    }

    pub fn set_unsubscribed_list(&mut self, list: HashSet<String>) {
        self.unsubscribed = Some(list);
        self.children_cache.clear();
        self.changed = true;
    }

    pub fn subscribed_contains(&self, id: &str) -> bool {
        self.subscribed.as_ref().is_some_and(|s| s.contains(id))
    }

    /// Unsubscribed mailbox names, sorted for deterministic iteration.
    pub fn unsubscribed_vec(&self) -> Vec<String> {
        let mut list: Vec<String> = self
            .unsubscribed
            .as_ref()
            .map(|u| u.iter().cloned().collect())
            .unwrap_or_default();
        list.sort();
        list
    }

    /// Mirrors a freshly inserted node's subscription state into the
    /// membership lists, when they have been built.
    pub fn record_membership(&mut self, id: &str, subscribed: bool) {
        if subscribed {
            if let Some(s) = self.subscribed.as_mut() {
                s.insert(id.to_string());
            }
        } else if let Some(u) = self.unsubscribed.as_mut() {
            u.insert(id.to_string());
        }
    }
}

fn contains_prefix(set: Option<&HashSet<String>>, prefix: &str) -> bool {
    set.map_or(false, |set| set.iter().any(|name| name.starts_with(prefix)))
}
