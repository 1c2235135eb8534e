pub mod document;
pub mod error;
pub mod path;
pub mod types;

pub use document::{Document, DocumentId};
pub use error::{CompileError, DbError, LoggerError, MigrateError, Result};
pub use path::{FieldPath, ID_FIELD};
pub use types::{MigrationResult, MigrationStatus};
