use super::collection::Collection;
use super::engine::{BulkWriteResult, CollectionOptions, DocumentStore, StoreStats, UpdateOne};
use crate::core::{DbError, Document, DocumentId, Result};
use crate::transaction::{SessionId, SessionManager, StagedWrite};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{Level, event};

#[derive(Default)]
struct StoreCounters {
    bulk_writes: AtomicU64,
    documents_modified: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_aborted: AtomicU64,
}

/// Schemaless in-memory document store with buffered transactions.
pub struct InMemoryDocumentStore {
    /// Each collection has its own lock; the map lock only guards registration.
    collections: RwLock<HashMap<String, Arc<RwLock<Collection>>>>,
    sessions: SessionManager,
    counters: StoreCounters,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            sessions: SessionManager::new(),
            counters: StoreCounters::default(),
        }
    }

    async fn get_collection(&self, name: &str) -> Result<Arc<RwLock<Collection>>> {
        self.collections
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::CollectionNotFound(name.to_string()))
    }

    /// Whether `session` has a transaction writes should be staged into.
    async fn transactional(&self, session: Option<SessionId>) -> Result<Option<SessionId>> {
        let Some(id) = session else {
            return Ok(None);
        };
        if self.sessions.in_transaction(id).await? {
            Ok(Some(id))
        } else {
            Ok(None)
        }
    }

    pub async fn open_sessions(&self) -> usize {
        self.sessions.open_sessions().await
    }
}

fn validate_collection_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DbError::InvalidCollectionName(
            "Collection name cannot be empty".to_string(),
        ));
    }
    if name.contains('\0') || name.contains('$') {
        return Err(DbError::InvalidCollectionName(format!(
            "Collection name '{}' cannot contain '$' or NUL characters",
            name
        )));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn collection_exists(&self, name: &str) -> bool {
        self.collections.read().await.contains_key(name)
    }

    async fn register_collection(&self, name: &str, options: CollectionOptions) -> Result<()> {
        validate_collection_name(name)?;
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(DbError::CollectionExists(name.to_string()));
        }
        collections.insert(
            name.to_string(),
            Arc::new(RwLock::new(Collection::new(name, options))),
        );
        Ok(())
    }

    async fn ensure_collection(&self, name: &str) -> Result<bool> {
        validate_collection_name(name)?;
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Ok(false);
        }
        collections.insert(
            name.to_string(),
            Arc::new(RwLock::new(Collection::new(name, CollectionOptions::permissive()))),
        );
        event!(Level::DEBUG, collection = %name, "registered permissive collection");
        Ok(true)
    }

    async fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Map<String, Value>>,
        session: Option<SessionId>,
    ) -> Result<Vec<DocumentId>> {
        self.ensure_collection(collection).await?;
        let handle = self.get_collection(collection).await?;
        let documents: Vec<Document> = documents
            .into_iter()
            .map(|body| Document::new(DocumentId::new(), body))
            .collect();
        let ids: Vec<DocumentId> = documents.iter().map(Document::id).collect();

        if let Some(session) = self.transactional(session).await? {
            let coll = handle.read().await;
            for document in &documents {
                coll.validate(document)?;
            }
            return self
                .sessions
                .with_active_transaction(session, |txn| {
                    let staged = txn.staged_mut(collection);
                    for document in documents {
                        staged.insert(
                            document.id(),
                            StagedWrite {
                                base_version: None,
                                document,
                            },
                        );
                    }
                    Ok(ids)
                })
                .await;
        }

        let mut coll = handle.write().await;
        for document in &documents {
            coll.validate(document)?;
        }
        for document in documents {
            coll.put(document);
        }
        Ok(ids)
    }

    async fn find_all(&self, collection: &str, session: Option<SessionId>) -> Result<Vec<Document>> {
        let handle = self.get_collection(collection).await?;
        let mut documents = handle.read().await.documents().to_vec();

        let Some(session) = session else {
            return Ok(documents);
        };
        self.sessions
            .record_reads(session, collection, documents.iter().map(|doc| (doc.id(), doc.version())))
            .await?;
        let Some(mut staged) = self.sessions.staged_snapshot(session, collection).await? else {
            return Ok(documents);
        };

        for document in documents.iter_mut() {
            if let Some(write) = staged.remove(&document.id()) {
                *document = write.document;
            }
        }
        // Whatever is left was inserted inside the transaction.
        let mut inserted: Vec<Document> = staged.into_values().map(|write| write.document).collect();
        inserted.sort_by_key(Document::id);
        documents.extend(inserted);
        Ok(documents)
    }

    async fn bulk_write(
        &self,
        collection: &str,
        operations: Vec<UpdateOne>,
        session: Option<SessionId>,
    ) -> Result<BulkWriteResult> {
        let handle = self.get_collection(collection).await?;
        self.counters.bulk_writes.fetch_add(1, Ordering::SeqCst);

        if let Some(session) = self.transactional(session).await? {
            let coll = handle.read().await;
            return self
                .sessions
                .with_active_transaction(session, |txn| {
                    let mut result = BulkWriteResult::default();
                    for (index, op) in operations.iter().enumerate() {
                        // Conflicts are checked against the version this
                        // transaction read, not the one current at staging.
                        let (base_version, current) = match txn.staged(collection).and_then(|s| s.get(&op.id)) {
                            Some(write) => (write.base_version, write.document.clone()),
                            None => match coll.get(op.id) {
                                Some(doc) => {
                                    let read = txn.read_version(collection, op.id).unwrap_or(doc.version());
                                    (Some(read), doc.clone())
                                }
                                None => continue,
                            },
                        };
                        result.matched += 1;

                        let mut next = current;
                        let outcome = op
                            .update
                            .apply_to(&mut next)
                            .and_then(|changed| coll.validate(&next).map(|_| changed));
                        match outcome {
                            Ok(true) => {
                                result.modified += 1;
                                txn.staged_mut(collection).insert(
                                    op.id,
                                    StagedWrite {
                                        base_version,
                                        document: next,
                                    },
                                );
                            }
                            Ok(false) => {}
                            Err(err) => {
                                // Nothing is applied until commit.
                                return Err(DbError::BulkWriteFailed {
                                    index,
                                    applied: 0,
                                    reason: err.to_string(),
                                });
                            }
                        }
                    }
                    Ok(result)
                })
                .await;
        }

        let mut coll = handle.write().await;
        let mut result = BulkWriteResult::default();
        for (index, op) in operations.iter().enumerate() {
            let Some(mut next) = coll.get(op.id).cloned() else {
                continue;
            };
            result.matched += 1;

            let outcome = op.update.apply_to(&mut next).and_then(|changed| {
                if changed {
                    coll.write(next)?;
                }
                Ok(changed)
            });
            match outcome {
                Ok(true) => {
                    result.modified += 1;
                    self.counters.documents_modified.fetch_add(1, Ordering::SeqCst);
                }
                Ok(false) => {}
                Err(err) => {
                    event!(
                        Level::WARN,
                        collection = %collection,
                        index,
                        error = %err,
                        "bulk write stopped; earlier operations remain applied"
                    );
                    return Err(DbError::BulkWriteFailed {
                        index,
                        applied: result.modified,
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(result)
    }

    async fn start_session(&self) -> Result<SessionId> {
        Ok(self.sessions.create().await)
    }

    async fn start_transaction(&self, session: SessionId) -> Result<()> {
        self.sessions.begin(session).await
    }

    async fn commit_transaction(&self, session: SessionId) -> Result<()> {
        let mut txn = self.sessions.take_for_commit(session).await?;

        let mut handles = Vec::with_capacity(txn.writes().len());
        for name in txn.writes().keys() {
            match self.get_collection(name).await {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    self.counters.transactions_aborted.fetch_add(1, Ordering::SeqCst);
                    return Err(err);
                }
            }
        }

        // Collection names iterate in sorted order, so locks are always taken
        // in the same order across sessions.
        let mut guards = Vec::with_capacity(handles.len());
        for handle in &handles {
            guards.push(handle.write().await);
        }

        for (guard, staged) in guards.iter().zip(txn.writes().values()) {
            for (id, write) in staged {
                let current = guard.get(*id).map(Document::version);
                if current != write.base_version {
                    self.counters.transactions_aborted.fetch_add(1, Ordering::SeqCst);
                    event!(Level::WARN, session = %session, document = %id, "write-write conflict at commit");
                    return Err(DbError::WriteConflict(id.to_string()));
                }
            }
        }

        let mut modified = 0u64;
        for (guard, staged) in guards.iter_mut().zip(txn.writes().values()) {
            for write in staged.values() {
                guard.put(write.document.clone());
                modified += 1;
            }
        }
        txn.commit()?;

        self.counters.documents_modified.fetch_add(modified, Ordering::SeqCst);
        self.counters.transactions_committed.fetch_add(1, Ordering::SeqCst);
        event!(Level::DEBUG, session = %session, documents = modified, "transaction committed");
        Ok(())
    }

    async fn abort_transaction(&self, session: SessionId) -> Result<()> {
        self.sessions.abort(session).await?;
        self.counters.transactions_aborted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn end_session(&self, session: SessionId) -> Result<()> {
        if self.sessions.end(session).await? {
            self.counters.transactions_aborted.fetch_add(1, Ordering::SeqCst);
            event!(Level::DEBUG, session = %session, "session ended with active transaction; aborted");
        }
        Ok(())
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            bulk_writes: self.counters.bulk_writes.load(Ordering::SeqCst),
            documents_modified: self.counters.documents_modified.load(Ordering::SeqCst),
            transactions_committed: self.counters.transactions_committed.load(Ordering::SeqCst),
            transactions_aborted: self.counters.transactions_aborted.load(Ordering::SeqCst),
        }
    }
}
