//! Job ledger storage
//!
//! - [`JobStore`] - the storage trait the core ledger is written against
//! - [`PostgresJobStore`] - shared ledger; deduplicates across processes
//! - [`MemoryJobStore`] - single-process ledger for tests and dry runs

pub mod factory;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use factory::{create_job_store, create_postgres_store};
pub use memory::MemoryJobStore;
pub use postgres::PostgresJobStore;
pub use traits::JobStore;
