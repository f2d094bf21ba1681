//! CLI command implementations

pub mod health;
pub mod init;
pub mod jobs;
pub mod migrate;
pub mod validate;

use crate::adapters::ledger::create_job_store;
use crate::adapters::satusehat::{FhirClient, TokenProvider};
use crate::config::MeraConfig;
use crate::core::{JobLedger, SenderRegistry};
use crate::domain::Result;
use std::sync::Arc;

/// Ledger built from configuration
pub(crate) fn build_ledger(config: &MeraConfig) -> Result<Arc<JobLedger>> {
    let store = create_job_store(config)?;
    Ok(Arc::new(JobLedger::new(store, config.jobs.max_retries)))
}

/// Token provider and the FHIR client that authenticates with it
pub(crate) fn build_client(config: &MeraConfig) -> Result<Arc<FhirClient>> {
    let tokens = Arc::new(TokenProvider::new(&config.satusehat)?);
    Ok(Arc::new(FhirClient::new(&config.satusehat, tokens)?))
}

/// Registry sending every resource kind through `client`
pub(crate) fn build_registry(client: Arc<FhirClient>) -> Arc<SenderRegistry> {
    Arc::new(SenderRegistry::for_client(client))
}
