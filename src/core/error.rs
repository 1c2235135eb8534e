use thiserror::Error;

/// Errors raised by the document store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    #[error("Collection '{0}' already exists")]
    CollectionExists(String),

    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Path conflict: {0}")]
    PathConflict(String),

    /// `applied` counts operations that modified a document before the
    /// failure; it is 0 inside a transaction, where nothing is applied
    /// before commit.
    #[error("Bulk write failed at operation {index} ({applied} applied): {reason}")]
    BulkWriteFailed {
        index: usize,
        applied: usize,
        reason: String,
    },

    #[error("Write-write conflict detected on document {0}")]
    WriteConflict(String),

    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Transaction not active on session {0}")]
    TransactionNotActive(String),

    #[error("Transaction already in progress on session {0}")]
    TransactionInProgress(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors raised while compiling an instruction. Always raised before any
/// document is read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("Malformed transform '{id}': {reason}")]
    MalformedTransform { id: String, reason: String },

    #[error("Transform '{0}' is not registered")]
    UnknownTransform(String),

    #[error("Invalid field path '{path}': {reason}")]
    InvalidFieldPath { path: String, reason: String },

    #[error("Field '{0}' is immutable")]
    ImmutableField(String),

    #[error("Field paths '{0}' and '{1}' conflict")]
    ConflictingPaths(String, String),
}

/// Errors raised by an audit logger.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoggerError {
    #[error("Audit store error: {0}")]
    Store(#[from] DbError),

    #[error("Audit serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LoggerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Top-level error returned by the migrator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrateError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Execution(#[from] DbError),

    #[error(transparent)]
    Logger(#[from] LoggerError),
}
