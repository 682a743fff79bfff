/// Errors produced by the data-access layer.
///
/// Nothing here is recovered locally: there are no retries and no fallback
/// paths. Every failure surfaces to the caller with enough context to
/// diagnose which statement, connection, or transaction state produced it.
#[derive(Debug)]
pub enum DataError {
    /// Invalid caller input (page index/size below 1, malformed parameter
    /// references). Signaled before any I/O is attempted.
    InvalidInput(String),
    /// Missing or blank connection-string configuration, or the driver
    /// failed to produce a connection. Signaled at first connection use.
    Configuration(String),
    /// Commit or rollback without a prior begin, or begin while a
    /// transaction is already active.
    Transaction(String),
    /// The underlying driver reported an error (malformed SQL, constraint
    /// violation, connectivity loss). Propagated unchanged.
    Database(Box<dyn std::error::Error + Send + Sync>),
    /// The cache provider failed on read or write. Never treated as a miss.
    Cache(Box<dyn std::error::Error + Send + Sync>),
    /// A row or scalar could not be mapped to the requested type.
    Decode(String),
    /// The session was already closed.
    Closed,
}

impl DataError {
    /// Construct a `Database` variant from any driver error type.
    ///
    /// Used by backend crates (e.g. `sqlkit-sqlx`) to wrap driver-specific
    /// errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    /// Construct a `Cache` variant from any cache-provider error type.
    pub fn cache(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Cache(Box::new(err))
    }

    /// Construct a `Decode` variant from anything displayable.
    pub fn decode(err: impl std::fmt::Display) -> Self {
        DataError::Decode(err.to_string())
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            DataError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            DataError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::Cache(err) => write!(f, "Cache provider error: {err}"),
            DataError::Decode(msg) => write!(f, "Decode error: {msg}"),
            DataError::Closed => write!(f, "Session is closed"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) | DataError::Cache(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
