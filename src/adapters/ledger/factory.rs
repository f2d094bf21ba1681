//! Job store factory

use super::postgres::PostgresJobStore;
use super::traits::JobStore;
use crate::config::MeraConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Creates the job store described by the configuration
///
/// # Errors
///
/// Returns an error if the PostgreSQL pool cannot be built
pub fn create_job_store(config: &MeraConfig) -> Result<Arc<dyn JobStore>> {
    let store = create_postgres_store(config)?;
    Ok(store as Arc<dyn JobStore>)
}

/// Creates the PostgreSQL store itself, for callers that need `migrate`
pub fn create_postgres_store(config: &MeraConfig) -> Result<Arc<PostgresJobStore>> {
    let store = PostgresJobStore::new(config.postgresql.clone())?;
    tracing::info!(
        database = %store.connection_string_safe(),
        max_connections = config.postgresql.max_connections,
        "Job ledger pool created"
    );
    Ok(Arc::new(store))
}
