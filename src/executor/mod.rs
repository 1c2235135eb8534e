pub mod executor;
mod transaction;

pub use executor::MigrationExecutor;
