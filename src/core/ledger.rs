//! Job ledger facade
//!
//! [`JobLedger`] is what the submitter and the retry engine talk to. It owns
//! the retry cap, converts documents to stored payloads, and refuses to
//! register a document under a resource tag of another kind.

use crate::adapters::ledger::JobStore;
use crate::domain::{
    BridgeError, CreateOutcome, FhirDocument, FhirId, IdempotencyKey, Job, JobFilter, JobId,
    JobStatus, ResourceType, Result, DEFAULT_MAX_RETRIES,
};
use serde::Serialize;
use std::sync::Arc;

/// Submission ledger with a fixed retry cap
pub struct JobLedger {
    store: Arc<dyn JobStore>,
    max_retries: u32,
}

impl JobLedger {
    pub fn new(store: Arc<dyn JobStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    /// Ledger with the default cap of three attempts
    pub fn with_default_cap(store: Arc<dyn JobStore>) -> Self {
        Self::new(store, DEFAULT_MAX_RETRIES)
    }

    /// Failed attempts after which a job is left alone
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Registers `document` for delivery under `(resource_type, key)`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] if the document kind does not
    /// match the tag's kind, or the store's error.
    pub async fn create_job(
        &self,
        resource_type: &ResourceType,
        key: &IdempotencyKey,
        document: &FhirDocument,
    ) -> Result<CreateOutcome> {
        if document.kind() != resource_type.kind() {
            return Err(BridgeError::Validation(format!(
                "{} document cannot be registered as {}",
                document.kind(),
                resource_type
            )));
        }

        let payload = serde_json::to_value(document)?;
        self.store.create_job(resource_type, key, &payload).await
    }

    pub async fn complete_job(&self, id: JobId, external_id: &FhirId) -> Result<bool> {
        self.store.complete_job(id, external_id).await
    }

    pub async fn fail_job(&self, id: JobId, error_message: &str) -> Result<bool> {
        self.store.fail_job(id, error_message).await
    }

    pub async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        self.store.get_job(id).await
    }

    /// Jobs matching `filter`, newest first, with per-status counts
    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<JobListing> {
        let jobs = self.store.list_jobs(filter).await?;
        Ok(JobListing::new(jobs))
    }

    /// Failed jobs still under the cap, oldest first
    pub async fn list_retryable(&self, limit: usize) -> Result<Vec<Job>> {
        self.store
            .list_failed_under_cap(self.max_retries, limit)
            .await
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

/// A page of jobs with status counts over that page
#[derive(Debug, Clone, Serialize)]
pub struct JobListing {
    pub total: usize,
    pub pending: usize,
    pub failed: usize,
    pub success: usize,
    pub jobs: Vec<Job>,
}

impl JobListing {
    fn new(jobs: Vec<Job>) -> Self {
        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count();
        Self {
            total: jobs.len(),
            pending: count(JobStatus::Pending),
            failed: count(JobStatus::Failed),
            success: count(JobStatus::Success),
            jobs,
        }
    }
}
