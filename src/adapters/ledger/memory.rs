//! In-process job ledger
//!
//! Holds every job behind a single async mutex, so the uniqueness check and
//! the insert happen as one step. Only deduplicates within one process; use
//! [`PostgresJobStore`](super::PostgresJobStore) when several instances share
//! a ledger.

use super::traits::JobStore;
use crate::domain::{
    CreateOutcome, FhirId, IdempotencyKey, Job, JobFilter, JobId, JobStatus, ResourceType, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

#[derive(Default)]
struct Ledger {
    next_id: i64,
    jobs: BTreeMap<JobId, Job>,
    keys: HashMap<(String, String), JobId>,
}

/// Job store kept in memory
#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<Ledger>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs held
    pub async fn len(&self) -> usize {
        self.inner.lock().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Overwrites the stored payload of a job, leaving its status alone
    ///
    /// Returns `false` if the job does not exist.
    pub async fn replace_payload(&self, id: JobId, payload: Value) -> bool {
        let mut ledger = self.inner.lock().await;
        match ledger.jobs.get_mut(&id) {
            Some(job) => {
                job.payload = payload;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(
        &self,
        resource_type: &ResourceType,
        idempotency_key: &IdempotencyKey,
        payload: &Value,
    ) -> Result<CreateOutcome> {
        let mut ledger = self.inner.lock().await;
        let ledger = &mut *ledger;

        let key = (
            resource_type.tag().to_string(),
            idempotency_key.as_str().to_string(),
        );
        let slot = match ledger.keys.entry(key) {
            Entry::Occupied(_) => return Ok(CreateOutcome::Duplicate),
            Entry::Vacant(slot) => slot,
        };

        ledger.next_id += 1;
        let id = JobId::new(ledger.next_id);
        let now = Utc::now();

        slot.insert(id);
        ledger.jobs.insert(
            id,
            Job {
                id,
                resource_type: resource_type.clone(),
                idempotency_key: idempotency_key.clone(),
                payload: payload.clone(),
                status: JobStatus::Pending,
                external_id: None,
                error_message: None,
                retry_count: 0,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(CreateOutcome::Created(id))
    }

    async fn complete_job(&self, id: JobId, external_id: &FhirId) -> Result<bool> {
        let mut ledger = self.inner.lock().await;
        match ledger.jobs.get_mut(&id) {
            Some(job) if !job.is_success() => {
                job.status = JobStatus::Success;
                job.external_id = Some(external_id.clone());
                job.error_message = None;
                job.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_job(&self, id: JobId, error_message: &str) -> Result<bool> {
        let mut ledger = self.inner.lock().await;
        match ledger.jobs.get_mut(&id) {
            Some(job) if !job.is_success() => {
                job.status = JobStatus::Failed;
                job.error_message = Some(error_message.to_string());
                job.retry_count += 1;
                job.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.inner.lock().await.jobs.get(&id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let ledger = self.inner.lock().await;
        let mut jobs: Vec<Job> = ledger
            .jobs
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        jobs.truncate(filter.limit);
        Ok(jobs)
    }

    async fn list_failed_under_cap(&self, cap: u32, limit: usize) -> Result<Vec<Job>> {
        let ledger = self.inner.lock().await;
        let mut jobs: Vec<Job> = ledger
            .jobs
            .values()
            .filter(|job| job.is_retryable(cap))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
