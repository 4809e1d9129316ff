use helixql_api::{EdgeId, NodeId, StoreError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between source text and materialized
/// output. The first four variants are user-facing query errors; the
/// rest signal trouble below the language surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed query text. Compilation aborts at the first offense;
    /// there is no recovery.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// The query names something the schema does not declare, or uses a
    /// construct the declared types cannot support. The query is never
    /// executed.
    #[error("bind error: {0}")]
    Bind(String),

    /// An explicit single-id fetch missed. Type scans that match nothing
    /// produce empty results instead.
    #[error("{label} `{id}` not found")]
    NotFound { label: String, id: NodeId },

    /// An edge endpoint does not resolve to a stored node. The query
    /// aborts; skipping the edge would hide store corruption.
    #[error("edge `{edge}` references missing node `{node}`")]
    DanglingReference { edge: EdgeId, node: NodeId },

    /// Supplied parameters disagree with the declared parameter list in
    /// arity or type. Raised before any storage access.
    #[error("parameter mismatch: {0}")]
    ParamMismatch(String),

    /// Invariant violation inside the engine. Indicates a defect in the
    /// binder or executor, not a user error.
    #[error("internal error: {0}")]
    Internal(String),

    /// The storage adapter reported an inconsistency of its own.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub(crate) fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Error::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    pub(crate) fn bind(message: impl Into<String>) -> Self {
        Error::Bind(message.into())
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }
}
