//! The error type shared by every fallible operation in this crate.
use crate::model::{ApplicationId, WorkspaceId};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while indexing windows, matching, binding,
/// persisting or launching a workspace.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A workspace id or definition could not be found.
    #[error("workspace {0} not found")]
    NotFound(WorkspaceId),

    /// An empty or otherwise malformed caller-supplied argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A title-only match could not be disambiguated and was skipped.
    #[error("ambiguous match for application {0}: {1}")]
    Ambiguous(ApplicationId, String),

    /// A registry claim was lost to a competing claimant.
    #[error("binding conflict for handle {handle} (held by {held_by:?})")]
    Conflict {
        /// The handle both claimants wanted.
        handle: u64,
        /// The application that currently holds the binding, if any.
        held_by: Option<ApplicationId>,
    },

    /// The definition store's optimistic-concurrency check failed.
    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// The version the caller last observed.
        expected: u64,
        /// The version actually present on disk.
        found: u64,
    },

    /// Filesystem or (de)serialization failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted document could not be parsed.
    #[error("malformed workspace document: {0}")]
    Serde(#[from] serde_json::Error),

    /// Process start or shell/package activation failed.
    #[error("activation failed for {0}: {1}")]
    Activation(String, String),

    /// A wait loop exceeded its deadline.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Shorthand for constructing an [`Error::InvalidArgument`] from any displayable message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
