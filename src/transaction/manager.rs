// ============================================================================
// Session Manager
// ============================================================================

use super::state::{Session, SessionId, StagedCollection, Transaction};
use crate::core::{DbError, DocumentId, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self) -> SessionId {
        let id = SessionId::new();
        self.sessions.write().await.insert(id, Session::new(id));
        id
    }

    pub async fn begin(&self, id: SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DbError::SessionNotFound(id.to_string()))?;

        if session.in_transaction() {
            return Err(DbError::TransactionInProgress(id.to_string()));
        }
        session.transaction = Some(Transaction::new());
        Ok(())
    }

    pub async fn in_transaction(&self, id: SessionId) -> Result<bool> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .map(Session::in_transaction)
            .ok_or_else(|| DbError::SessionNotFound(id.to_string()))
    }

    /// Runs `f` against the session's active transaction.
    pub async fn with_active_transaction<T, F>(&self, id: SessionId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction) -> Result<T>,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DbError::SessionNotFound(id.to_string()))?;

        match session.transaction.as_mut() {
            Some(txn) if txn.is_active() => f(txn),
            _ => Err(DbError::TransactionNotActive(id.to_string())),
        }
    }

    /// Copy of the writes staged for `collection`, or `None` when the session
    /// has no active transaction.
    pub async fn staged_snapshot(&self, id: SessionId, collection: &str) -> Result<Option<StagedCollection>> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(&id)
            .ok_or_else(|| DbError::SessionNotFound(id.to_string()))?;

        Ok(session
            .transaction
            .as_ref()
            .filter(|txn| txn.is_active())
            .map(|txn| txn.staged(collection).cloned().unwrap_or_default()))
    }

    /// Records the committed versions observed by a read. No-op when the
    /// session has no active transaction.
    pub async fn record_reads<I>(&self, id: SessionId, collection: &str, versions: I) -> Result<()>
    where
        I: IntoIterator<Item = (DocumentId, u64)>,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DbError::SessionNotFound(id.to_string()))?;

        if let Some(txn) = session.transaction.as_mut().filter(|txn| txn.is_active()) {
            for (doc_id, version) in versions {
                txn.record_read(collection, doc_id, version);
            }
        }
        Ok(())
    }

    /// Detaches the active transaction so its writes can be applied.
    pub async fn take_for_commit(&self, id: SessionId) -> Result<Transaction> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DbError::SessionNotFound(id.to_string()))?;

        match session.transaction.take() {
            Some(txn) if txn.is_active() => Ok(txn),
            _ => Err(DbError::TransactionNotActive(id.to_string())),
        }
    }

    pub async fn abort(&self, id: SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DbError::SessionNotFound(id.to_string()))?;

        match session.transaction.take() {
            Some(mut txn) if txn.is_active() => txn.rollback(),
            _ => Err(DbError::TransactionNotActive(id.to_string())),
        }
    }

    /// Closes the session. Returns true when an active transaction had to be
    /// aborted.
    pub async fn end(&self, id: SessionId) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        let mut session = sessions
            .remove(&id)
            .ok_or_else(|| DbError::SessionNotFound(id.to_string()))?;

        match session.transaction.take() {
            Some(mut txn) if txn.is_active() => {
                txn.rollback()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn open_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}
