//! Public types for tree consumers.
//!
//! These are the plain records handed across the API boundary. Internal bit
//! layouts (`store::Attr`) never leak out; renderers receive `NodeView`
//! structs with resolved booleans.

use serde::{Deserialize, Serialize};

/// Access mode for the tree.
///
/// Mail mode pins and protects `INBOX`; news mode has no such anchor and
/// disallows ad hoc insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeMode {
    #[default]
    Mail,
    News,
}

/// How freshly discovered folders start out during bulk initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialExpand {
    /// Everything starts collapsed.
    #[default]
    None,
    /// Everything starts expanded.
    All,
    /// Consult the open-folder persistence collaborator.
    User,
}

/// Options for [`crate::MailboxTree::initialize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    /// Include unsubscribed mailboxes in the view.
    pub show_unsubscribed: bool,
    /// Fetch the entire hierarchy up front instead of discovering lazily.
    pub fetch_all: bool,
}

bitflags::bitflags! {
    /// Traversal mask for [`crate::MailboxTree::advance`] and `peek`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Traverse: u8 {
        /// Descend into closed elements as well as open ones.
        const SHOW_CLOSED = 1 << 0;
        /// Only yield subscribed elements for the duration of the call.
        const SUBSCRIBED_ONLY = 1 << 1;
    }
}

/// A plain node record as exposed to renderers and other consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    /// Canonical mailbox path.
    pub id: String,
    /// Display label (last path segment, decoded).
    pub label: String,
    /// Indentation level under the node's namespace.
    pub depth: usize,
    /// Parent path, or `None` at the root level.
    pub parent: Option<String>,
    pub has_children: bool,
    pub is_container: bool,
    pub is_open: bool,
    pub is_subscribed: bool,
    pub is_discovered: bool,
    pub is_polled: bool,
    pub is_namespace: bool,
}
