use crate::core::{DbError, Document, DocumentId, FieldPath, Result};
use crate::transaction::SessionId;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Field-level changes for one document: `$set` then `$unset`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDocument {
    pub set: Vec<(FieldPath, Value)>,
    pub unset: Vec<FieldPath>,
}

impl UpdateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Rejects updates touching `_id` or whose paths overlap each other.
    pub fn validate(&self) -> Result<()> {
        let paths: Vec<&FieldPath> = self
            .set
            .iter()
            .map(|(path, _)| path)
            .chain(self.unset.iter())
            .collect();

        for (i, a) in paths.iter().enumerate() {
            if a.is_id() {
                return Err(DbError::InvalidUpdate(format!(
                    "Performing an update on the path '{}' would modify the immutable field '_id'",
                    a
                )));
            }
            for b in &paths[i + 1..] {
                if a.overlaps(b) {
                    return Err(DbError::InvalidUpdate(format!(
                        "Updating the path '{}' would create a conflict at '{}'",
                        b, a
                    )));
                }
            }
        }
        Ok(())
    }

    /// Applies the update in place. Returns whether the document changed.
    pub fn apply_to(&self, document: &mut Document) -> Result<bool> {
        self.validate()?;
        let before = document.body().clone();
        for (path, value) in &self.set {
            document.set_path(path, value.clone())?;
        }
        for path in &self.unset {
            document.unset_path(path);
        }
        Ok(document.body() != &before)
    }
}

/// A single-document update addressed by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOne {
    pub id: DocumentId,
    pub update: UpdateDocument,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    pub matched: usize,
    pub modified: usize,
}

/// Per-collection document check, run before every write.
pub type DocumentValidator = Arc<dyn Fn(&Document) -> std::result::Result<(), String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct CollectionOptions {
    pub validator: Option<DocumentValidator>,
}

impl CollectionOptions {
    /// Schemaless: every document is accepted.
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Document) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }
}

impl fmt::Debug for CollectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionOptions")
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// Write and transaction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub bulk_writes: u64,
    pub documents_modified: u64,
    pub transactions_committed: u64,
    pub transactions_aborted: u64,
}

/// Document store contract used by the migration engine.
///
/// Passing `Some(session)` runs the operation inside that session: reads see
/// the session's own staged writes, and writes are staged until commit when
/// a transaction is active.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn collection_exists(&self, name: &str) -> bool;

    async fn register_collection(&self, name: &str, options: CollectionOptions) -> Result<()>;

    /// Registers a permissive collection if `name` is unknown. Returns true
    /// when the collection was created by this call.
    async fn ensure_collection(&self, name: &str) -> Result<bool>;

    async fn list_collections(&self) -> Vec<String>;

    /// Inserts new documents, creating the collection if it is unknown.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Map<String, Value>>,
        session: Option<SessionId>,
    ) -> Result<Vec<DocumentId>>;

    async fn find_all(&self, collection: &str, session: Option<SessionId>) -> Result<Vec<Document>>;

    /// Ordered bulk update; stops at the first failing operation.
    async fn bulk_write(
        &self,
        collection: &str,
        operations: Vec<UpdateOne>,
        session: Option<SessionId>,
    ) -> Result<BulkWriteResult>;

    async fn start_session(&self) -> Result<SessionId>;

    async fn start_transaction(&self, session: SessionId) -> Result<()>;

    async fn commit_transaction(&self, session: SessionId) -> Result<()>;

    async fn abort_transaction(&self, session: SessionId) -> Result<()>;

    /// Closes the session, aborting any transaction still active on it.
    async fn end_session(&self, session: SessionId) -> Result<()>;

    fn stats(&self) -> StoreStats;
}
