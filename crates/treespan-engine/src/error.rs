//! Engine error kinds.
//!
//! Every failure is raised synchronously at the point of violation and never
//! retried. Running out of content during traversal or tokenization is *not*
//! an error; those paths report empty/terminal results instead.

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The range has been detached and can no longer be used.
    #[error("range is detached")]
    InvalidState,

    /// An offset fell outside the valid bounds of its node.
    #[error("offset {offset} is out of bounds (max {max})")]
    IndexSize { offset: usize, max: usize },

    /// A structurally invalid insertion, e.g. inserting a node into its own
    /// subtree.
    #[error("invalid node hierarchy: {0}")]
    HierarchyRequest(String),

    /// An operand node does not belong to the tree being operated on.
    #[error("node does not belong to this tree")]
    WrongDocument,

    /// A serialized range's shape checksum no longer matches the tree.
    #[error("tree shape changed: stored checksum {stored:08x}, computed {computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// A malformed call sequence, e.g. comparing positions that share no
    /// common ancestor.
    #[error("{0}")]
    Usage(String),
}

impl EngineError {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        EngineError::Usage(message.into())
    }

    pub(crate) fn hierarchy(message: impl Into<String>) -> Self {
        EngineError::HierarchyRequest(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
