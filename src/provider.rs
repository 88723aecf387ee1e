//! External interfaces: the mailbox directory and the persistence stores.
//!
//! The tree never talks a protocol itself. Everything it learns about the
//! actual mailbox hierarchy comes through [`DirectoryProvider`], and the two
//! optional persistence collaborators carry user state (expanded folders,
//! poll list) across sessions.
//!
//! The `Memory*` implementations are cloneable handles over shared state, so
//! a test or embedder can keep a handle to the same backing data the tree
//! owns and mutate or inspect it from outside.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

/// What the backend knows about a mailbox's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildrenHint {
    /// The backend did not say.
    #[default]
    Unknown,
    /// The backend asserts children exist.
    Has,
    /// The backend asserts there are none.
    HasNone,
}

/// One mailbox as reported by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxEntry {
    /// Full mailbox path.
    pub name: String,
    /// Whether messages can be stored here. Non-selectable entries become
    /// containers in the tree.
    pub selectable: bool,
    pub children: ChildrenHint,
    /// Whether this entry marks a namespace boundary rather than a real
    /// mailbox.
    pub namespace_boundary: bool,
}

impl MailboxEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selectable: true,
            children: ChildrenHint::Unknown,
            namespace_boundary: false,
        }
    }
}

/// Source of truth for the mailbox hierarchy.
///
/// Patterns use IMAP wildcards: `%` matches any run of characters short of
/// the hierarchy delimiter, `*` matches anything.
pub trait DirectoryProvider {
    /// Lists mailboxes matching `pattern`, with attributes and hints.
    fn list(&mut self, pattern: &str) -> ProviderResult<Vec<MailboxEntry>>;

    /// Lists the names of subscribed mailboxes matching `pattern`.
    fn list_subscribed(&mut self, pattern: &str) -> ProviderResult<Vec<String>>;

    /// Lists the names of all mailboxes matching `pattern`, subscribed or
    /// not.
    fn list_all(&mut self, pattern: &str) -> ProviderResult<Vec<String>>;
}

/// Persistence for the set of folders the user keeps expanded.
pub trait OpenFolderStore {
    /// Loads the persisted set once per session.
    fn initialize(&mut self) -> HashSet<String>;
    fn add(&mut self, name: &str);
    fn remove(&mut self, name: &str);
}

/// Persistence for the set of folders checked for new mail.
pub trait PollListStore {
    fn get(&mut self) -> HashSet<String>;
    fn add(&mut self, name: &str);
    fn remove(&mut self, name: &str);
}

/// Matches an IMAP-style listing pattern against a mailbox name.
pub(crate) fn pattern_matches(pattern: &str, name: &str, delimiter: char) -> bool {
    fn step(p: &[char], n: &[char], delimiter: char) -> bool {
        match p.split_first() {
            None => n.is_empty(),
            Some(('*', rest)) => {
                (0..=n.len()).any(|i| step(rest, &n[i..], delimiter))
            }
            Some(('%', rest)) => {
                let mut i = 0;
                loop {
                    if step(rest, &n[i..], delimiter) {
                        return true;
                    }
                    if i >= n.len() || n[i] == delimiter {
                        return false;
                    }
                    i += 1;
                }
            }
            Some((c, rest)) => n.first() == Some(c) && step(rest, &n[1..], delimiter),
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    step(&p, &n, delimiter)
}

#[derive(Debug)]
struct DirectoryInner {
    delimiter: char,
    boxes: BTreeMap<String, MailboxEntry>,
    subscribed: HashSet<String>,
    report_hints: bool,
    fail_listings: bool,
    list_calls: Vec<String>,
}

/// In-memory [`DirectoryProvider`].
///
/// Children hints are derived from the stored hierarchy unless
/// [`report_children_hints`](Self::report_children_hints) is switched off or
/// an entry carries an explicit hint. Every `list` pattern is recorded and
/// can be read back through [`list_calls`](Self::list_calls).
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    inner: Arc<Mutex<DirectoryInner>>,
}

impl MemoryDirectory {
    pub fn new(delimiter: char) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DirectoryInner {
                delimiter,
                boxes: BTreeMap::new(),
                subscribed: HashSet::new(),
                report_hints: true,
                fail_listings: false,
                list_calls: Vec::new(),
            })),
        }
    }

    /// Adds a selectable mailbox.
    pub fn add(&self, name: &str) {
        self.add_entry(MailboxEntry::new(name));
    }

    pub fn add_entry(&self, entry: MailboxEntry) {
        self.inner.lock().boxes.insert(entry.name.clone(), entry);
    }

    pub fn remove(&self, name: &str) {
        let mut inner = self.inner.lock();
        inner.boxes.remove(name);
        inner.subscribed.remove(name);
    }

    pub fn subscribe(&self, name: &str) {
        self.inner.lock().subscribed.insert(name.to_string());
    }

    pub fn unsubscribe(&self, name: &str) {
        self.inner.lock().subscribed.remove(name);
    }

    /// Whether listings should carry derived children hints. On by default.
    pub fn report_children_hints(&self, report: bool) {
        self.inner.lock().report_hints = report;
    }

    /// Makes every listing fail, for exercising degraded paths.
    pub fn fail_listings(&self, fail: bool) {
        self.inner.lock().fail_listings = fail;
    }

    /// Patterns passed to [`DirectoryProvider::list`] so far.
    pub fn list_calls(&self) -> Vec<String> {
        self.inner.lock().list_calls.clone()
    }

    pub fn clear_list_calls(&self) {
        self.inner.lock().list_calls.clear();
    }
}

impl DirectoryProvider for MemoryDirectory {
    fn list(&mut self, pattern: &str) -> ProviderResult<Vec<MailboxEntry>> {
        let mut inner = self.inner.lock();
        if inner.fail_listings {
            return Err(ProviderError::Listing(format!("listing {pattern:?} refused")));
        }
        inner.list_calls.push(pattern.to_string());

        let delimiter = inner.delimiter;
        let mut out = Vec::new();
        let names: Vec<String> = inner
            .boxes
            .keys()
            .filter(|name| pattern_matches(pattern, name, delimiter))
            .cloned()
            .collect();
        for name in names {
            let mut entry = inner.boxes[&name].clone();
            if !inner.report_hints {
                entry.children = ChildrenHint::Unknown;
            } else if entry.children == ChildrenHint::Unknown {
                let child_prefix = format!("{name}{delimiter}");
                entry.children = if inner.boxes.keys().any(|k| k.starts_with(&child_prefix)) {
                    ChildrenHint::Has
                } else {
                    ChildrenHint::HasNone
                };
            }
            out.push(entry);
        }
        Ok(out)
    }

    fn list_subscribed(&mut self, pattern: &str) -> ProviderResult<Vec<String>> {
        let inner = self.inner.lock();
        if inner.fail_listings {
            return Err(ProviderError::Listing(format!("listing {pattern:?} refused")));
        }
        let mut names: Vec<String> = inner
            .subscribed
            .iter()
            .filter(|name| pattern_matches(pattern, name, inner.delimiter))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    fn list_all(&mut self, pattern: &str) -> ProviderResult<Vec<String>> {
        let inner = self.inner.lock();
        if inner.fail_listings {
            return Err(ProviderError::Listing(format!("listing {pattern:?} refused")));
        }
        Ok(inner
            .boxes
            .keys()
            .filter(|name| pattern_matches(pattern, name, inner.delimiter))
            .cloned()
            .collect())
    }
}

/// In-memory [`OpenFolderStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryOpenFolders {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl MemoryOpenFolders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str) {
        self.inner.lock().insert(name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().contains(name)
    }

    pub fn snapshot(&self) -> HashSet<String> {
        self.inner.lock().clone()
    }
}

impl OpenFolderStore for MemoryOpenFolders {
    fn initialize(&mut self) -> HashSet<String> {
        self.inner.lock().clone()
    }

    fn add(&mut self, name: &str) {
        self.inner.lock().insert(name.to_string());
    }

    fn remove(&mut self, name: &str) {
        self.inner.lock().remove(name);
    }
}

/// In-memory [`PollListStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryPollList {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl MemoryPollList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str) {
        self.inner.lock().insert(name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().contains(name)
    }

    pub fn snapshot(&self) -> HashSet<String> {
        self.inner.lock().clone()
    }
}

impl PollListStore for MemoryPollList {
    fn get(&mut self) -> HashSet<String> {
        self.inner.lock().clone()
    }

    fn add(&mut self, name: &str) {
        self.inner.lock().insert(name.to_string());
    }

    fn remove(&mut self, name: &str) {
        self.inner.lock().remove(name);
    }
}
