use crate::audit::{AuditLogger, MigrationLog, StoreAuditLogger};
use crate::config::MigratorConfig;
use crate::core::{LoggerError, MigrateError, MigrationResult};
use crate::executor::MigrationExecutor;
use crate::instruction::Instruction;
use crate::planner::MigrationPlan;
use crate::storage::DocumentStore;
use crate::transform::{CompiledInstruction, TransformCompiler, TransformRegistry};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Outcome of a migration together with the outcome of its audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    pub result: MigrationResult,
    pub log: Result<(), LoggerError>,
}

/// Applies migration instructions to a document store.
///
/// # Examples
///
/// ```ignore
/// let store = Arc::new(InMemoryDocumentStore::new());
/// let mut registry = TransformRegistry::new();
/// registry.register_arc("full_name", builtins::concat_fields(&["firstName", "lastName"], " "))?;
///
/// let migrator = Migrator::new(store, registry);
/// let instruction = Instruction::new("users")
///     .with_transform("fullName", "full_name")
///     .with_removal("firstName")
///     .with_removal("lastName");
///
/// let result = migrator.apply_instruction(&instruction, true).await?;
/// assert_eq!(result.status, MigrationStatus::Success);
/// ```
pub struct Migrator {
    executor: MigrationExecutor,
    registry: Arc<TransformRegistry>,
    logger: Arc<dyn AuditLogger>,
}

impl Migrator {
    /// Default configuration; audit records go to the `migrationLog`
    /// collection of the same store.
    pub fn new(store: Arc<dyn DocumentStore>, registry: TransformRegistry) -> Self {
        Self::with_config(store, registry, MigratorConfig::default())
    }

    pub fn with_config(store: Arc<dyn DocumentStore>, registry: TransformRegistry, config: MigratorConfig) -> Self {
        let logger = Arc::new(StoreAuditLogger::new(store.clone(), config.log_collection.clone()));
        Self {
            executor: MigrationExecutor::new(store, config),
            registry: Arc::new(registry),
            logger,
        }
    }

    /// Replaces the audit logger.
    pub fn with_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &MigratorConfig {
        self.executor.config()
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.executor.store()
    }

    pub fn compile(&self, instruction: &Instruction) -> Result<CompiledInstruction, MigrateError> {
        Ok(TransformCompiler::new(&self.registry).compile(instruction)?)
    }

    /// Applies `instruction` and appends one audit record.
    ///
    /// With `with_transaction` every store failure is reported as a FAILED
    /// result. Without it, store failures are returned as errors and no audit
    /// record is written. A failing audit write fails the call.
    pub async fn apply_instruction(
        &self,
        instruction: &Instruction,
        with_transaction: bool,
    ) -> Result<MigrationResult, MigrateError> {
        let report = self.apply_instruction_with_report(instruction, with_transaction).await?;
        report.log?;
        Ok(report.result)
    }

    /// Like [`apply_instruction`](Self::apply_instruction), but an audit
    /// failure is reported alongside the result instead of failing the call.
    pub async fn apply_instruction_with_report(
        &self,
        instruction: &Instruction,
        with_transaction: bool,
    ) -> Result<MigrationReport, MigrateError> {
        let span = info_span!(
            "migration.apply",
            collection = %instruction.collection,
            transactional = with_transaction
        );

        async move {
            let compiled = self.compile(instruction)?;

            let result = if with_transaction {
                self.executor.apply_with_transaction(&compiled).await
            } else {
                self.executor.apply(&compiled, None).await?
            };
            event!(Level::INFO, status = %result.status, message = %result.message, "migration finished");

            let log = self.logger.record(MigrationLog::new(instruction, &result)).await;
            if let Err(err) = &log {
                event!(Level::ERROR, error = %err, "audit record failed");
            }

            Ok::<_, MigrateError>(MigrationReport { result, log })
        }
        .instrument(span)
        .await
    }

    /// Applies several instructions concurrently. Results are returned in
    /// input order.
    pub async fn migrate(
        &self,
        instructions: &[Instruction],
        with_transaction: bool,
    ) -> Vec<Result<MigrationResult, MigrateError>> {
        join_all(
            instructions
                .iter()
                .map(|instruction| self.apply_instruction(instruction, with_transaction)),
        )
        .await
    }

    /// Computes the writes `instruction` would issue, without writing or
    /// logging anything.
    pub async fn explain_instruction(&self, instruction: &Instruction) -> Result<MigrationPlan, MigrateError> {
        let compiled = self.compile(instruction)?;
        Ok(self.executor.explain(&compiled).await?)
    }
}
