//! Job ledger storage trait

use crate::domain::{CreateOutcome, FhirId, IdempotencyKey, Job, JobFilter, JobId, ResourceType, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Persistent store of submission jobs
///
/// Implementations must make [`create_job`](JobStore::create_job) atomic with
/// respect to `(resource_type, idempotency_key)`: of any number of concurrent
/// calls with the same pair, exactly one observes `Created`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Registers a new job in `pending` state
    ///
    /// Returns [`CreateOutcome::Duplicate`] when the pair already exists,
    /// whatever the existing row's status.
    async fn create_job(
        &self,
        resource_type: &ResourceType,
        idempotency_key: &IdempotencyKey,
        payload: &Value,
    ) -> Result<CreateOutcome>;

    /// Marks a job delivered
    ///
    /// Returns `false` (and changes nothing) if the job does not exist or is
    /// already `success`.
    async fn complete_job(&self, id: JobId, external_id: &FhirId) -> Result<bool>;

    /// Records a failed attempt and increments `retry_count`
    ///
    /// Returns `false` (and changes nothing) if the job does not exist or is
    /// already `success`.
    async fn fail_job(&self, id: JobId, error_message: &str) -> Result<bool>;

    async fn get_job(&self, id: JobId) -> Result<Option<Job>>;

    /// Jobs matching `filter`, newest first
    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>>;

    /// Failed jobs with `retry_count < cap`, oldest first
    async fn list_failed_under_cap(&self, cap: u32, limit: usize) -> Result<Vec<Job>>;

    /// Connectivity check
    async fn ping(&self) -> Result<()>;
}
