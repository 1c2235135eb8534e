/// Audit tests
///
/// Audit records written per migration attempt, and how logger failures
/// reach the caller
/// Run with: cargo test --test audit_tests

use async_trait::async_trait;
use docmigrate::{
    AuditLogger, DocumentStore, InMemoryDocumentStore, Instruction, LoggerError, MigrateError, MigrationLog,
    MigrationStatus, Migrator, MigratorConfig, StoreAuditLogger, TransformRegistry,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

struct FailingLogger;

#[async_trait]
impl AuditLogger for FailingLogger {
    async fn record(&self, _entry: MigrationLog) -> Result<(), LoggerError> {
        Err(LoggerError::Serialization("audit sink unavailable".to_string()))
    }
}

#[derive(Default)]
struct RecordingLogger {
    entries: Mutex<Vec<MigrationLog>>,
}

#[async_trait]
impl AuditLogger for RecordingLogger {
    async fn record(&self, entry: MigrationLog) -> Result<(), LoggerError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

async fn store_with_user() -> Arc<InMemoryDocumentStore> {
    let store = Arc::new(InMemoryDocumentStore::new());
    store
        .insert_many("users", vec![json!({"legacy": 1}).as_object().cloned().unwrap()], None)
        .await
        .unwrap();
    store
}

fn drop_legacy() -> Instruction {
    Instruction::new("users").with_removal("legacy").with_comments("drop legacy flag")
}

#[tokio::test]
async fn test_one_record_per_attempt() {
    let store = store_with_user().await;
    let migrator = Migrator::new(store.clone(), TransformRegistry::new());

    migrator.apply_instruction(&drop_legacy(), true).await.unwrap();
    migrator.apply_instruction(&drop_legacy(), false).await.unwrap();

    let logs = StoreAuditLogger::new(store.clone(), "migrationLog").entries().await.unwrap();
    assert_eq!(logs.len(), 2);
    for log in &logs {
        assert_eq!(log.target, "users");
        assert_eq!(log.status, MigrationStatus::Success);
        assert_eq!(log.status_message, "Migration successful");
        assert_eq!(log.comments.as_deref(), Some("drop legacy flag"));
        assert_eq!(log.instruction, drop_legacy());
    }
    assert!(logs[0].executed_at <= logs[1].executed_at);
}

#[tokio::test]
async fn test_custom_log_collection() {
    let store = store_with_user().await;
    let config = MigratorConfig::new().log_collection("auditTrail");
    let migrator = Migrator::with_config(store.clone(), TransformRegistry::new(), config);

    migrator.apply_instruction(&drop_legacy(), false).await.unwrap();

    assert!(store.collection_exists("auditTrail").await);
    assert!(!store.collection_exists("migrationLog").await);
    let logs = StoreAuditLogger::new(store.clone(), "auditTrail").entries().await.unwrap();
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn test_logger_failure_fails_the_call() {
    let store = store_with_user().await;
    let migrator = Migrator::new(store.clone(), TransformRegistry::new()).with_logger(Arc::new(FailingLogger));

    let err = migrator.apply_instruction(&drop_legacy(), false).await.unwrap_err();
    assert_eq!(
        err,
        MigrateError::Logger(LoggerError::Serialization("audit sink unavailable".to_string()))
    );

    // The migration itself already happened.
    let users = store.find_all("users", None).await.unwrap();
    assert!(!users[0].contains("legacy"));
}

#[tokio::test]
async fn test_report_exposes_both_outcomes() {
    let store = store_with_user().await;
    let migrator = Migrator::new(store.clone(), TransformRegistry::new()).with_logger(Arc::new(FailingLogger));

    let report = migrator
        .apply_instruction_with_report(&drop_legacy(), true)
        .await
        .unwrap();

    assert_eq!(report.result.status, MigrationStatus::Success);
    assert!(matches!(report.log, Err(LoggerError::Serialization(_))));
}

#[tokio::test]
async fn test_injected_logger_receives_records() {
    let store = store_with_user().await;
    let logger = Arc::new(RecordingLogger::default());
    let migrator = Migrator::new(store.clone(), TransformRegistry::new()).with_logger(logger.clone());

    let missing = Instruction::new("ghost").with_removal("legacy");
    let ghost_result = migrator.apply_instruction(&missing, true).await.unwrap();
    migrator.apply_instruction(&drop_legacy(), true).await.unwrap();

    let entries = logger.entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].target, "ghost");
    assert_eq!(entries[0].status, ghost_result.status);
    assert_eq!(entries[1].target, "users");

    // Nothing goes to the store-backed log when a logger is injected.
    drop(entries);
    assert!(!store.collection_exists("migrationLog").await);
}
