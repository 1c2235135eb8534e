use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIGRATION_SUCCESSFUL: &str = "Migration successful";
pub const NO_DOCUMENTS_FOUND: &str = "No documents found, skipping migration";

/// Outcome class of one migration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationStatus {
    Success,
    Warning,
    Failed,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStatus::Success => write!(f, "SUCCESS"),
            MigrationStatus::Warning => write!(f, "WARNING"),
            MigrationStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Result of applying one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    pub status: MigrationStatus,
    pub message: String,
}

impl MigrationResult {
    pub fn new(status: MigrationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(MigrationStatus::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(MigrationStatus::Warning, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(MigrationStatus::Failed, message)
    }

    pub fn is_success(&self) -> bool {
        self.status == MigrationStatus::Success
    }
}
