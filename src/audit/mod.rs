//! Audit records for migration attempts.
//!
//! One [`MigrationLog`] is appended per attempt. Records are never updated
//! or deleted by this crate.

mod store_logger;

pub use store_logger::StoreAuditLogger;

use crate::core::{LoggerError, MigrationResult, MigrationStatus};
use crate::instruction::Instruction;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationLog {
    pub target: String,
    pub instruction: Instruction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub status: MigrationStatus,
    pub status_message: String,
    pub executed_at: DateTime<Utc>,
}

impl MigrationLog {
    /// Builds the record for `instruction`'s outcome, stamped now.
    pub fn new(instruction: &Instruction, result: &MigrationResult) -> Self {
        Self {
            target: instruction.collection.clone(),
            instruction: instruction.clone(),
            comments: instruction.comments.clone(),
            status: result.status,
            status_message: result.message.clone(),
            executed_at: Utc::now(),
        }
    }
}

/// Sink for audit records.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn record(&self, entry: MigrationLog) -> Result<(), LoggerError>;
}
