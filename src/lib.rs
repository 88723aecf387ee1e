//! A lazily-discovered, filterable, sortable view of a hierarchical mailbox
//! namespace.
//!
//! [`MailboxTree`] builds its picture of the hierarchy from a
//! [`DirectoryProvider`], one level at a time: expanding a node fetches its
//! children on first use, and a full prefetch is available at
//! initialization. On top of the discovered structure it layers
//! subscription-based filtering, stable natural-order sorting with `INBOX`
//! pinned first, a resumable pre-order [cursor](MailboxTree::advance), and
//! [change tracking](MailboxTree::diff) between snapshots.
//!
//! ```no_run
//! use mailtree::{InitOptions, MailboxTree, MemoryDirectory, Traverse, TreeConfig};
//!
//! let dir = MemoryDirectory::new('/');
//! dir.add("INBOX");
//! dir.subscribe("INBOX");
//!
//! let mut tree = MailboxTree::new(TreeConfig::default(), Box::new(dir));
//! tree.initialize(InitOptions::default());
//!
//! let mut current = tree.reset();
//! while let Some(node) = current {
//!     println!("{}{}", "  ".repeat(node.depth), node.label);
//!     current = tree.advance(Traverse::SHOW_CLOSED);
//! }
//! ```

mod cursor;
mod diff;
mod discovery;
mod error;
mod namespace;
mod provider;
mod sort;
mod store;
mod tree;
mod types;

pub use diff::TreeDiff;
pub use error::{ProviderError, ProviderResult};
pub use namespace::{Namespace, NamespaceKind, NamespaceRegistry};
pub use provider::{
    ChildrenHint, DirectoryProvider, MailboxEntry, MemoryDirectory, MemoryOpenFolders,
    MemoryPollList, OpenFolderStore, PollListStore,
};
pub use sort::NameComparator;
pub use tree::{MailboxTree, TreeConfig};
pub use types::{InitOptions, InitialExpand, NodeView, Traverse, TreeMode};
