pub mod collection;
pub mod engine;
pub mod memory;

pub use collection::Collection;
pub use engine::{
    BulkWriteResult, CollectionOptions, DocumentStore, DocumentValidator, StoreStats, UpdateDocument, UpdateOne,
};
pub use memory::InMemoryDocumentStore;
