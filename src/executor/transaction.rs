// ============================================================================
// Transaction Wrapper
// ============================================================================
//
// Runs the executor's apply step inside a store transaction:
// start session -> start transaction -> apply -> commit | abort -> end session
//
// Store errors become a FAILED result; the session is ended on every path.
//
// ============================================================================

use super::MigrationExecutor;
use crate::core::{MigrationResult, Result};
use crate::transaction::SessionId;
use crate::transform::CompiledInstruction;
use tracing::{Level, event};

impl MigrationExecutor {
    /// Applies `compiled` atomically. Never returns an error: failures are
    /// reported as a FAILED result.
    pub async fn apply_with_transaction(&self, compiled: &CompiledInstruction) -> MigrationResult {
        let session = match self.store.start_session().await {
            Ok(session) => session,
            Err(err) => {
                event!(Level::ERROR, error = %err, "failed to start session");
                return MigrationResult::failed(err.to_string());
            }
        };

        let outcome = self.run_in_transaction(compiled, session).await;

        if let Err(err) = self.store.end_session(session).await {
            event!(Level::WARN, session = %session, error = %err, "failed to end session");
        }

        match outcome {
            Ok(result) => result,
            Err(err) => {
                event!(
                    Level::ERROR,
                    collection = %compiled.collection,
                    error = %err,
                    "transactional migration failed"
                );
                MigrationResult::failed(err.to_string())
            }
        }
    }

    async fn run_in_transaction(&self, compiled: &CompiledInstruction, session: SessionId) -> Result<MigrationResult> {
        self.store.start_transaction(session).await?;

        match self.apply(compiled, Some(session)).await {
            Ok(result) => {
                self.store.commit_transaction(session).await?;
                event!(Level::DEBUG, session = %session, "migration transaction committed");
                Ok(result)
            }
            Err(err) => {
                if let Err(abort_err) = self.store.abort_transaction(session).await {
                    event!(Level::WARN, session = %session, error = %abort_err, "abort failed");
                }
                Err(err)
            }
        }
    }
}
