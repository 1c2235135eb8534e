// ============================================================================
// Session & Transaction Management
// ============================================================================
//
// Buffered transactions: writes are staged per session and applied to the
// collections on commit, with write-write conflict detection against the
// document versions the writes were based on.
//
// ============================================================================

pub mod manager;
pub mod state;

pub use manager::SessionManager;
pub use state::{Session, SessionId, StagedCollection, StagedWrite, Transaction, TransactionState};
