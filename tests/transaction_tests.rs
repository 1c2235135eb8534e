/// Transaction tests
///
/// Atomicity of transactional migrations and prefix semantics of
/// non-transactional ones
/// Run with: cargo test --test transaction_tests

use async_trait::async_trait;
use docmigrate::{
    BulkWriteResult, CollectionOptions, DbError, Document, DocumentId, DocumentStore, FieldPath,
    InMemoryDocumentStore, Instruction, MigrateError, MigrationStatus, Migrator, SessionId, StoreAuditLogger,
    StoreStats, TransformRegistry, UpdateDocument, UpdateOne, builtins,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn body(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn registry() -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    registry
        .register_arc("full_name", builtins::concat_fields(&["firstName", "lastName"], " "))
        .unwrap();
    registry
}

fn instruction() -> Instruction {
    Instruction::new("users")
        .with_transform("fullName", "full_name")
        .with_removal("firstName")
        .with_removal("lastName")
}

/// Three users; the validator rejects the second one once migrated.
async fn seeded_store() -> Arc<InMemoryDocumentStore> {
    let store = Arc::new(InMemoryDocumentStore::new());
    let options = CollectionOptions::permissive().with_validator(|doc| {
        if doc.get_str("fullName") == Some("Mallory X") {
            Err("fullName is banned".to_string())
        } else {
            Ok(())
        }
    });
    store.register_collection("users", options).await.unwrap();
    store
        .insert_many(
            "users",
            vec![
                body(json!({"firstName": "Alice", "lastName": "A"})),
                body(json!({"firstName": "Mallory", "lastName": "X"})),
                body(json!({"firstName": "Carol", "lastName": "C"})),
            ],
            None,
        )
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_transactional_commit() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store
        .insert_many(
            "users",
            vec![
                body(json!({"firstName": "Alice", "lastName": "A"})),
                body(json!({"firstName": "Bob", "lastName": "B"})),
            ],
            None,
        )
        .await
        .unwrap();

    let migrator = Migrator::new(store.clone(), registry());
    let result = migrator.apply_instruction(&instruction(), true).await.unwrap();
    assert_eq!(result.status, MigrationStatus::Success);

    let users = store.find_all("users", None).await.unwrap();
    assert_eq!(users[0].get_str("fullName"), Some("Alice A"));
    assert_eq!(users[1].get_str("fullName"), Some("Bob B"));
    assert!(users.iter().all(|user| !user.contains("firstName")));

    let stats = store.stats();
    assert_eq!(stats.transactions_committed, 1);
    assert_eq!(stats.transactions_aborted, 0);
    assert_eq!(store.open_sessions().await, 0);
}

#[tokio::test]
async fn test_transactional_failure_changes_nothing() {
    let store = seeded_store().await;
    let before = store.find_all("users", None).await.unwrap();

    let migrator = Migrator::new(store.clone(), registry());
    let result = migrator.apply_instruction(&instruction(), true).await.unwrap();

    assert_eq!(result.status, MigrationStatus::Failed);
    assert!(result.message.contains("Bulk write failed at operation 1"));
    assert!(result.message.contains("fullName is banned"));

    // Not even the first document was touched.
    assert_eq!(store.find_all("users", None).await.unwrap(), before);
    assert_eq!(store.stats().transactions_aborted, 1);
    assert_eq!(store.stats().documents_modified, 0);
    assert_eq!(store.open_sessions().await, 0);

    // The failure is still audited, outside the aborted transaction.
    let logs = StoreAuditLogger::new(store.clone(), "migrationLog").entries().await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, MigrationStatus::Failed);
    assert_eq!(logs[0].status_message, result.message);
}

#[tokio::test]
async fn test_non_transactional_failure_keeps_prefix() {
    let store = seeded_store().await;

    let migrator = Migrator::new(store.clone(), registry());
    let err = migrator.apply_instruction(&instruction(), false).await.unwrap_err();

    match err {
        MigrateError::Execution(DbError::BulkWriteFailed { index, applied, .. }) => {
            assert_eq!(index, 1);
            assert_eq!(applied, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let users = store.find_all("users", None).await.unwrap();
    assert_eq!(users[0].get_str("fullName"), Some("Alice A"));
    assert!(!users[0].contains("firstName"));
    assert_eq!(users[1].get_str("firstName"), Some("Mallory"));
    assert_eq!(users[2].get_str("firstName"), Some("Carol"));

    // Execution errors outside a transaction are not audited.
    assert!(!store.collection_exists("migrationLog").await);
}

#[tokio::test]
async fn test_transactional_empty_collection_commits() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.ensure_collection("users").await.unwrap();

    let migrator = Migrator::new(store.clone(), registry());
    let result = migrator.apply_instruction(&instruction(), true).await.unwrap();

    assert_eq!(result.status, MigrationStatus::Success);
    assert_eq!(store.stats().bulk_writes, 0);
    assert_eq!(store.stats().transactions_aborted, 0);
    assert_eq!(store.open_sessions().await, 0);
}

#[tokio::test]
async fn test_concurrent_transactional_migrations_on_distinct_collections() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let collections = ["alpha", "beta", "gamma", "delta"];
    for name in collections {
        store
            .insert_many(
                name,
                (0..10)
                    .map(|i| body(json!({"firstName": name, "lastName": i.to_string()})))
                    .collect(),
                None,
            )
            .await
            .unwrap();
    }

    let migrator = Migrator::new(store.clone(), registry());
    let instructions: Vec<Instruction> = collections
        .iter()
        .map(|name| Instruction::new(*name).with_transform("fullName", "full_name"))
        .collect();

    let results = migrator.migrate(&instructions, true).await;
    assert!(results.iter().all(|r| r.as_ref().map(|r| r.is_success()).unwrap_or(false)));

    for name in collections {
        let docs = store.find_all(name, None).await.unwrap();
        assert_eq!(docs.len(), 10);
        assert!(docs.iter().all(|doc| doc.contains("fullName")));
    }
    assert_eq!(store.stats().transactions_committed, 4);
}

/// Delegates to an in-memory store, but lets another writer rename every
/// targeted user just before the first transactional bulk write.
struct ContendedStore {
    inner: Arc<InMemoryDocumentStore>,
    interfered: AtomicBool,
}

#[async_trait]
impl DocumentStore for ContendedStore {
    async fn collection_exists(&self, name: &str) -> bool {
        self.inner.collection_exists(name).await
    }

    async fn register_collection(&self, name: &str, options: CollectionOptions) -> docmigrate::Result<()> {
        self.inner.register_collection(name, options).await
    }

    async fn ensure_collection(&self, name: &str) -> docmigrate::Result<bool> {
        self.inner.ensure_collection(name).await
    }

    async fn list_collections(&self) -> Vec<String> {
        self.inner.list_collections().await
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Map<String, Value>>,
        session: Option<SessionId>,
    ) -> docmigrate::Result<Vec<DocumentId>> {
        self.inner.insert_many(collection, documents, session).await
    }

    async fn find_all(&self, collection: &str, session: Option<SessionId>) -> docmigrate::Result<Vec<Document>> {
        self.inner.find_all(collection, session).await
    }

    async fn bulk_write(
        &self,
        collection: &str,
        operations: Vec<UpdateOne>,
        session: Option<SessionId>,
    ) -> docmigrate::Result<BulkWriteResult> {
        if session.is_some() && !self.interfered.swap(true, Ordering::SeqCst) {
            let renames = operations
                .iter()
                .map(|op| UpdateOne {
                    id: op.id,
                    update: UpdateDocument {
                        set: vec![(FieldPath::parse("lastName").unwrap(), json!("Smith"))],
                        unset: vec![],
                    },
                })
                .collect();
            self.inner.bulk_write(collection, renames, None).await?;
        }
        self.inner.bulk_write(collection, operations, session).await
    }

    async fn start_session(&self) -> docmigrate::Result<SessionId> {
        self.inner.start_session().await
    }

    async fn start_transaction(&self, session: SessionId) -> docmigrate::Result<()> {
        self.inner.start_transaction(session).await
    }

    async fn commit_transaction(&self, session: SessionId) -> docmigrate::Result<()> {
        self.inner.commit_transaction(session).await
    }

    async fn abort_transaction(&self, session: SessionId) -> docmigrate::Result<()> {
        self.inner.abort_transaction(session).await
    }

    async fn end_session(&self, session: SessionId) -> docmigrate::Result<()> {
        self.inner.end_session(session).await
    }

    fn stats(&self) -> StoreStats {
        self.inner.stats()
    }
}

#[tokio::test]
async fn test_commit_conflict_is_reported_as_failed() {
    let inner = Arc::new(InMemoryDocumentStore::new());
    inner
        .insert_many("users", vec![body(json!({"firstName": "John", "lastName": "Doe"}))], None)
        .await
        .unwrap();
    let store = Arc::new(ContendedStore {
        inner: inner.clone(),
        interfered: AtomicBool::new(false),
    });

    let migrator = Migrator::new(store, registry());
    let result = migrator.apply_instruction(&instruction(), true).await.unwrap();

    assert_eq!(result.status, MigrationStatus::Failed);
    assert!(result.message.contains("Write-write conflict"));
    assert_eq!(inner.open_sessions().await, 0);
    assert_eq!(inner.stats().transactions_committed, 0);
    assert_eq!(inner.stats().transactions_aborted, 1);

    // Only the competing write landed.
    let users = inner.find_all("users", None).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].get_str("firstName"), Some("John"));
    assert_eq!(users[0].get_str("lastName"), Some("Smith"));
    assert!(!users[0].contains("fullName"));

    let logs = StoreAuditLogger::new(inner.clone(), "migrationLog").entries().await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, MigrationStatus::Failed);
    assert_eq!(logs[0].status_message, result.message);
}
