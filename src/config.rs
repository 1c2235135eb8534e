use crate::core::MigrationStatus;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_COLLECTION: &str = "migrationLog";

/// Status reported when the target collection holds no documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmptyCollectionPolicy {
    #[default]
    Success,
    Warning,
}

impl EmptyCollectionPolicy {
    pub fn status(&self) -> MigrationStatus {
        match self {
            EmptyCollectionPolicy::Success => MigrationStatus::Success,
            EmptyCollectionPolicy::Warning => MigrationStatus::Warning,
        }
    }
}

/// Migrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MigratorConfig {
    /// Collection the store-backed audit logger appends to
    pub log_collection: String,

    /// Outcome of migrating an empty collection
    pub empty_collection: EmptyCollectionPolicy,

    /// Register unknown target collections on the fly. When disabled, an
    /// unknown collection yields a WARNING result instead.
    pub auto_register_collections: bool,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            log_collection: DEFAULT_LOG_COLLECTION.to_string(),
            empty_collection: EmptyCollectionPolicy::Success,
            auto_register_collections: true,
        }
    }
}

impl MigratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the audit log collection name
    pub fn log_collection(mut self, name: &str) -> Self {
        self.log_collection = name.to_string();
        self
    }

    /// Set the status reported for empty collections
    pub fn empty_collection(mut self, policy: EmptyCollectionPolicy) -> Self {
        self.empty_collection = policy;
        self
    }

    pub fn auto_register_collections(mut self, enabled: bool) -> Self {
        self.auto_register_collections = enabled;
        self
    }

    /// Parse a configuration from JSON; missing keys take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
