use helixql_api::{EdgeId, NodeId, StoreError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("record encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unknown node `{0}`")]
    UnknownNode(NodeId),

    #[error("unknown edge `{0}`")]
    UnknownEdge(EdgeId),
}
