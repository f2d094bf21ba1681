//! Retry outcomes

use crate::domain::{FhirId, JobId};
use serde::Serialize;
use std::fmt;

/// Result class of one retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStatus {
    /// Sent and recorded as success
    Success,
    /// Sent, failed again; `retry_count` was incremented
    Failed,
    /// Not attempted: already delivered or out of attempts
    Skipped,
    /// Not attempted: the job could not be loaded or dispatched
    Error,
}

impl fmt::Display for RetryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RetryStatus::Success => "success",
            RetryStatus::Failed => "failed",
            RetryStatus::Skipped => "skipped",
            RetryStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Outcome of retrying one job
#[derive(Debug, Clone, Serialize)]
pub struct RetryOutcome {
    pub job_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub status: RetryStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<FhirId>,
    /// For failed sends: whether trying again later may succeed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transient: Option<bool>,
}

impl RetryOutcome {
    pub(crate) fn new(job_id: JobId, status: RetryStatus, message: impl Into<String>) -> Self {
        Self {
            job_id,
            resource_type: None,
            status,
            message: message.into(),
            external_id: None,
            transient: None,
        }
    }

    pub(crate) fn for_resource(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub(crate) fn with_external_id(mut self, external_id: FhirId) -> Self {
        self.external_id = Some(external_id);
        self
    }

    pub(crate) fn with_transient(mut self, transient: bool) -> Self {
        self.transient = Some(transient);
        self
    }
}

/// Summary of a retry sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetryReport {
    /// Jobs picked up by the sweep
    pub retried: usize,
    pub succeeded: usize,
    pub still_failed: usize,
    pub details: Vec<RetryOutcome>,
}

impl RetryReport {
    pub(crate) fn push(&mut self, outcome: RetryOutcome) {
        self.retried += 1;
        match outcome.status {
            RetryStatus::Success => self.succeeded += 1,
            RetryStatus::Failed => self.still_failed += 1,
            RetryStatus::Skipped | RetryStatus::Error => {}
        }
        self.details.push(outcome);
    }

    /// Outcomes that were neither delivered nor failed again
    pub fn not_attempted(&self) -> usize {
        self.retried - self.succeeded - self.still_failed
    }
}
