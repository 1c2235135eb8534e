// ============================================================================
// Session & Transaction State
// ============================================================================
//
// A session owns at most one transaction at a time. Writes made inside a
// transaction are staged per collection and only become visible to other
// sessions on commit.
//
// Active ──commit──> Committed
//   │
//   └──abort───> Aborted
//
// ============================================================================

use crate::core::{DbError, Document, DocumentId, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a store session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn new() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

impl TransactionState {
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::Aborted)
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Active => write!(f, "ACTIVE"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// A document write waiting for commit.
#[derive(Debug, Clone)]
pub struct StagedWrite {
    /// Committed version the write was based on; `None` for inserts.
    pub base_version: Option<u64>,
    pub document: Document,
}

pub type StagedCollection = HashMap<DocumentId, StagedWrite>;

#[derive(Debug)]
pub struct Transaction {
    state: TransactionState,
    writes: BTreeMap<String, StagedCollection>,
    /// Committed version of every document first read by this transaction.
    read_versions: HashMap<String, HashMap<DocumentId, u64>>,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            state: TransactionState::Active,
            writes: BTreeMap::new(),
            read_versions: HashMap::new(),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn staged(&self, collection: &str) -> Option<&StagedCollection> {
        self.writes.get(collection)
    }

    pub fn staged_mut(&mut self, collection: &str) -> &mut StagedCollection {
        self.writes.entry(collection.to_string()).or_default()
    }

    /// Staged writes keyed by collection, in collection-name order.
    pub fn writes(&self) -> &BTreeMap<String, StagedCollection> {
        &self.writes
    }

    pub fn write_count(&self) -> usize {
        self.writes.values().map(HashMap::len).sum()
    }

    /// Remembers the committed version a read observed. Later reads of the
    /// same document keep the first version.
    pub fn record_read(&mut self, collection: &str, id: DocumentId, version: u64) {
        self.read_versions
            .entry(collection.to_string())
            .or_default()
            .entry(id)
            .or_insert(version);
    }

    pub fn read_version(&self, collection: &str, id: DocumentId) -> Option<u64> {
        self.read_versions.get(collection)?.get(&id).copied()
    }

    pub fn commit(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(DbError::ExecutionError(format!(
                "Cannot commit transaction in state {}",
                self.state
            )));
        }
        self.state = TransactionState::Committed;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(DbError::ExecutionError(format!(
                "Cannot abort transaction in state {}",
                self.state
            )));
        }
        self.writes.clear();
        self.read_versions.clear();
        self.state = TransactionState::Aborted;
        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    pub(crate) transaction: Option<Transaction>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            transaction: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.as_ref().is_some_and(Transaction::is_active)
    }
}
