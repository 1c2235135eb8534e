// ============================================================================
// DocMigrate Library
// ============================================================================

//! Declarative migrations for schemaless document collections.
//!
//! An [`Instruction`] names a collection and three kinds of rules: fields
//! derived by a registered transform, fields copied from another path, and
//! fields removed. The [`Migrator`] compiles the instruction, rewrites every
//! document of the collection with a single ordered bulk write, optionally
//! inside a transaction, and appends an audit record of the attempt.
//!
//! # Examples
//!
//! ```
//! use docmigrate::{
//!     DocumentStore, InMemoryDocumentStore, Instruction, MigrationStatus, Migrator, TransformRegistry, builtins,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let user = json!({"firstName": "Ada", "lastName": "Lovelace"});
//! store
//!     .insert_many("users", vec![user.as_object().cloned().unwrap()], None)
//!     .await
//!     .unwrap();
//!
//! let mut registry = TransformRegistry::new();
//! registry
//!     .register_arc("full_name", builtins::concat_fields(&["firstName", "lastName"], " "))
//!     .unwrap();
//!
//! let migrator = Migrator::new(store.clone(), registry);
//! let instruction = Instruction::new("users")
//!     .with_transform("fullName", "full_name")
//!     .with_removal("firstName")
//!     .with_removal("lastName");
//!
//! let result = migrator.apply_instruction(&instruction, true).await.unwrap();
//! assert_eq!(result.status, MigrationStatus::Success);
//!
//! let users = store.find_all("users", None).await.unwrap();
//! assert_eq!(users[0].get_str("fullName"), Some("Ada Lovelace"));
//! assert!(!users[0].contains("firstName"));
//! # });
//! ```

pub mod audit;
pub mod config;
pub mod core;
pub mod executor;
pub mod facade;
pub mod instruction;
pub mod planner;
pub mod storage;
pub mod transaction;
pub mod transform;

// Re-export main types for convenience
pub use audit::{AuditLogger, MigrationLog, StoreAuditLogger};
pub use config::{DEFAULT_LOG_COLLECTION, EmptyCollectionPolicy, MigratorConfig};
pub use core::{
    CompileError, DbError, Document, DocumentId, FieldPath, LoggerError, MigrateError, MigrationResult,
    MigrationStatus, Result,
};
pub use facade::{MigrationReport, Migrator};
pub use instruction::{AddFromOld, AddWithTransform, Instruction, RemoveOld};
pub use planner::MigrationPlan;
pub use storage::{
    BulkWriteResult, CollectionOptions, DocumentStore, InMemoryDocumentStore, StoreStats, UpdateDocument, UpdateOne,
};
pub use transaction::SessionId;
pub use transform::{TransformFn, TransformRegistry, builtins};
