//! Job ledger domain model
//!
//! A [`Job`] is one row of the submission ledger: the record that a logical
//! clinical event, identified by `(resource_type, idempotency_key)`, has been
//! registered for delivery, and what happened when it was sent.

use crate::domain::ids::{FhirId, IdempotencyKey, JobId};
use crate::domain::resource::ResourceType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of attempts after which a job is no longer retried
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default row limit for listings and retry sweeps
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Delivery status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Registered, send not yet recorded
    Pending,
    /// Delivered; terminal
    Success,
    /// Last send attempt failed
    Failed,
}

impl JobStatus {
    /// Column value
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!(
                "Invalid job status '{other}'. Must be one of: pending, success, failed"
            )),
        }
    }
}

/// A persisted submission attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Surrogate key
    pub id: JobId,

    /// Resource tag the job was registered under
    pub resource_type: ResourceType,

    /// Caller-supplied deduplication key
    pub idempotency_key: IdempotencyKey,

    /// Snapshot of the exact document that was or will be sent
    pub payload: serde_json::Value,

    /// Delivery status
    pub status: JobStatus,

    /// Id assigned by the exchange on success
    pub external_id: Option<FhirId>,

    /// Message of the last failure
    pub error_message: Option<String>,

    /// Number of failed attempts so far
    pub retry_count: u32,

    /// When the job was registered
    pub created_at: DateTime<Utc>,

    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether the job has been delivered
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    /// Whether the job failed and still has attempts left under `cap`
    pub fn is_retryable(&self, cap: u32) -> bool {
        self.status == JobStatus::Failed && self.retry_count < cap
    }

    /// Whether the job has used up its attempts
    pub fn is_exhausted(&self, cap: u32) -> bool {
        self.retry_count >= cap
    }
}

/// Result of registering a submission in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new row was inserted
    Created(JobId),
    /// A row for this `(resource_type, idempotency_key)` already exists
    Duplicate,
}

/// Filters for listing jobs
///
/// The date range is inclusive and compares the calendar date of
/// `created_at`; it only applies when both ends are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFilter {
    /// Only jobs in this status
    pub status: Option<JobStatus>,

    /// Only jobs with this exact resource tag
    pub resource_type: Option<String>,

    /// First creation date to include
    pub created_from: Option<NaiveDate>,

    /// Last creation date to include
    pub created_to: Option<NaiveDate>,

    /// Maximum number of rows
    pub limit: usize,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            status: None,
            resource_type: None,
            created_from: None,
            created_to: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl JobFilter {
    /// Filter on status
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter on resource tag
    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Filter on an inclusive creation-date range
    pub fn created_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.created_from = Some(from);
        self.created_to = Some(to);
        self
    }

    /// Set the row limit; zero falls back to the default
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };
        self
    }

    /// The date range, when both ends are present
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.created_from, self.created_to) {
            (Some(from), Some(to)) => Some((from, to)),
            _ => None,
        }
    }

    /// Whether `job` passes every filter except the limit
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(status) = self.status {
            if job.status != status {
                return false;
            }
        }
        if let Some(ref tag) = self.resource_type {
            if job.resource_type.tag() != tag {
                return false;
            }
        }
        if let Some((from, to)) = self.date_range() {
            let day = job.created_at.date_naive();
            if day < from || day > to {
                return false;
            }
        }
        true
    }
}
