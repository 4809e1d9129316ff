use std::fmt;

/// The error type for database operations.
#[derive(Debug)]
pub enum Error {
    /// Compilation or execution failure, carrying the full query-error
    /// taxonomy (syntax, bind, not-found, dangling reference, ...).
    Query(helixql_query::Error),
    /// Storage-layer failure outside query execution.
    Storage(helixql_storage::Error),
    /// Write rejected by schema validation.
    Schema(String),
    /// Name not present in the registered query set.
    UnknownQuery(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Query(e) => write!(f, "query error: {}", e),
            Error::Storage(e) => write!(f, "storage error: {}", e),
            Error::Schema(e) => write!(f, "schema error: {}", e),
            Error::UnknownQuery(name) => write!(f, "unknown query `{}`", name),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => Some(e),
            Error::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<helixql_query::Error> for Error {
    fn from(e: helixql_query::Error) -> Self {
        Error::Query(e)
    }
}

impl From<helixql_storage::Error> for Error {
    fn from(e: helixql_storage::Error) -> Self {
        Error::Storage(e)
    }
}

impl From<helixql_api::StoreError> for Error {
    fn from(e: helixql_api::StoreError) -> Self {
        Error::Storage(helixql_storage::Error::from(e))
    }
}

/// A specialized Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;
