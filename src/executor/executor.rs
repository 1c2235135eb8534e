// ============================================================================
// Migration Executor
// ============================================================================
//
// LOADING -> (EMPTY | BUILDING -> WRITING) -> DONE
//
// Loads every document of the target collection, plans the per-document
// updates and issues them as a single ordered bulk write.
//
// ============================================================================

use crate::config::MigratorConfig;
use crate::core::types::{MIGRATION_SUCCESSFUL, NO_DOCUMENTS_FOUND};
use crate::core::{Document, MigrationResult, Result};
use crate::planner::{MigrationPlan, MigrationPlanner};
use crate::storage::DocumentStore;
use crate::transaction::SessionId;
use crate::transform::CompiledInstruction;
use std::sync::Arc;
use tracing::{Level, event};

pub struct MigrationExecutor {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) config: MigratorConfig,
}

impl MigrationExecutor {
    pub fn new(store: Arc<dyn DocumentStore>, config: MigratorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Loads all documents of `collection`.
    ///
    /// Unknown collections are registered as permissive collections, unless
    /// auto registration is disabled, in which case `None` is returned.
    pub async fn load(&self, collection: &str, session: Option<SessionId>) -> Result<Option<Vec<Document>>> {
        if !self.store.collection_exists(collection).await {
            if !self.config.auto_register_collections {
                return Ok(None);
            }
            self.store.ensure_collection(collection).await?;
        }
        self.store.find_all(collection, session).await.map(Some)
    }

    /// Applies the compiled rules to every document of the collection.
    ///
    /// Store failures are returned as-is; under a session the caller owns
    /// commit and abort.
    pub async fn apply(&self, compiled: &CompiledInstruction, session: Option<SessionId>) -> Result<MigrationResult> {
        let collection = compiled.collection.as_str();

        let Some(documents) = self.load(collection, session).await? else {
            event!(Level::WARN, collection = %collection, "target collection not found");
            return Ok(MigrationResult::warning(format!(
                "Collection '{}' not found, skipping migration",
                collection
            )));
        };

        if documents.is_empty() {
            event!(Level::INFO, collection = %collection, "no documents found, skipping migration");
            return Ok(MigrationResult::new(
                self.config.empty_collection.status(),
                NO_DOCUMENTS_FOUND,
            ));
        }

        let operations = MigrationPlanner::new(compiled).plan(&documents);
        event!(
            Level::DEBUG,
            collection = %collection,
            documents = documents.len(),
            operations = operations.len(),
            "migration planned"
        );

        if !operations.is_empty() {
            let written = self.store.bulk_write(collection, operations, session).await?;
            event!(
                Level::INFO,
                collection = %collection,
                matched = written.matched,
                modified = written.modified,
                "bulk write issued"
            );
        }

        Ok(MigrationResult::success(MIGRATION_SUCCESSFUL))
    }

    /// Plans the migration without writing anything.
    pub async fn explain(&self, compiled: &CompiledInstruction) -> Result<MigrationPlan> {
        let collection = compiled.collection.as_str();
        let documents = if self.store.collection_exists(collection).await {
            self.store.find_all(collection, None).await?
        } else {
            Vec::new()
        };

        Ok(MigrationPlan {
            collection: collection.to_string(),
            documents_scanned: documents.len(),
            operations: MigrationPlanner::new(compiled).plan(&documents),
        })
    }
}
