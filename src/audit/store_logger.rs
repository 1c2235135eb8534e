use super::{AuditLogger, MigrationLog};
use crate::core::{ID_FIELD, LoggerError};
use crate::storage::DocumentStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{Level, event};

/// Appends audit records to a collection of a [`DocumentStore`].
///
/// Records are written outside any migration session, so they survive an
/// aborted migration transaction.
pub struct StoreAuditLogger {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl StoreAuditLogger {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// All records written so far, oldest first.
    pub async fn entries(&self) -> Result<Vec<MigrationLog>, LoggerError> {
        if !self.store.collection_exists(&self.collection).await {
            return Ok(Vec::new());
        }
        let documents = self.store.find_all(&self.collection, None).await?;
        documents
            .into_iter()
            .map(|document| {
                let mut body = document.body().clone();
                body.remove(ID_FIELD);
                serde_json::from_value(Value::Object(body)).map_err(LoggerError::from)
            })
            .collect()
    }
}

#[async_trait]
impl AuditLogger for StoreAuditLogger {
    async fn record(&self, entry: MigrationLog) -> Result<(), LoggerError> {
        let body = match serde_json::to_value(&entry)? {
            Value::Object(map) => map,
            other => {
                return Err(LoggerError::Serialization(format!(
                    "audit record must serialize to an object, got {}",
                    other
                )));
            }
        };

        self.store.ensure_collection(&self.collection).await?;
        self.store.insert_many(&self.collection, vec![body], None).await?;
        event!(
            Level::DEBUG,
            log_collection = %self.collection,
            target = %entry.target,
            status = %entry.status,
            "audit record written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MigrationResult;
    use crate::instruction::Instruction;
    use crate::storage::InMemoryDocumentStore;

    #[test]
    fn test_record_and_read_back() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let logger = StoreAuditLogger::new(store.clone(), "audit");

        tokio_test::block_on(async {
            assert!(logger.entries().await.unwrap().is_empty());

            let instruction = Instruction::new("users").with_comments("first");
            logger
                .record(MigrationLog::new(&instruction, &MigrationResult::success("ok")))
                .await
                .unwrap();

            let entries = logger.entries().await.unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].target, "users");
            assert_eq!(entries[0].comments.as_deref(), Some("first"));
            assert!(store.collection_exists("audit").await);
        });
    }
}
