//! Error types for the directory-provider boundary.
//!
//! The tree itself never raises: structural operations report failure through
//! boolean returns (stale ids are an expected caller error). The only fallible
//! edge is the external directory provider, and even those failures are
//! downgraded to empty listings by the callers in this crate.

use std::io;

/// Errors surfaced by a mailbox directory provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("directory listing failed: {0}")]
    Listing(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
