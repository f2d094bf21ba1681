//! Operator-triggered retry of failed jobs
//!
//! A retry updates the existing ledger row in place. The stored payload is
//! sent as is; nothing is rebuilt from source data.

use super::registry::SenderRegistry;
use super::report::{RetryOutcome, RetryReport, RetryStatus};
use crate::core::ledger::JobLedger;
use crate::domain::{FhirDocument, JobId, Result};
use crate::{log_error_with_context, log_job_outcome, log_retry_attempt};
use std::sync::Arc;

/// Re-sends failed jobs through the sender registry
pub struct RetryEngine {
    ledger: Arc<JobLedger>,
    senders: Arc<SenderRegistry>,
}

impl RetryEngine {
    pub fn new(ledger: Arc<JobLedger>, senders: Arc<SenderRegistry>) -> Self {
        Self { ledger, senders }
    }

    /// Retries one job
    ///
    /// Never returns an error: every way the retry can end is reported in the
    /// outcome.
    pub async fn retry_one(&self, job_id: JobId) -> RetryOutcome {
        let job = match self.ledger.get_job(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => return RetryOutcome::new(job_id, RetryStatus::Error, "job not found"),
            Err(e) => {
                log_error_with_context!(&e, "Failed to load job for retry");
                return RetryOutcome::new(job_id, RetryStatus::Error, e.to_string());
            }
        };
        let tag = job.resource_type.tag().to_string();

        if job.is_success() {
            return RetryOutcome::new(job_id, RetryStatus::Skipped, "already success")
                .for_resource(tag);
        }

        let cap = self.ledger.max_retries();
        if job.is_exhausted(cap) {
            return RetryOutcome::new(
                job_id,
                RetryStatus::Skipped,
                format!("max retries ({cap}) reached"),
            )
            .for_resource(tag);
        }

        let kind = job.resource_type.kind();
        let document = match FhirDocument::from_stored(kind, &job.payload) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(job_id = %job_id, resource_type = %tag, error = %e, "Stored payload is unusable");
                return RetryOutcome::new(job_id, RetryStatus::Error, "invalid payload")
                    .for_resource(tag);
            }
        };

        let sender = match self.senders.sender(kind) {
            Ok(sender) => sender,
            Err(e) => {
                return RetryOutcome::new(job_id, RetryStatus::Error, e.to_string())
                    .for_resource(tag)
            }
        };

        log_retry_attempt!(job_id, job.retry_count + 1, cap);

        match sender.send(&document).await {
            Ok(fhir_id) => match self.ledger.complete_job(job_id, &fhir_id).await {
                Ok(true) => {
                    log_job_outcome!(job_id, tag, job.idempotency_key, "success");
                    RetryOutcome::new(job_id, RetryStatus::Success, "sent")
                        .for_resource(tag)
                        .with_external_id(fhir_id)
                }
                Ok(false) => {
                    // The row went to success while this send was in flight
                    tracing::warn!(
                        job_id = %job_id,
                        resource_type = %tag,
                        fhir_id = %fhir_id,
                        "Job was already complete; the ledger keeps its earlier id"
                    );
                    RetryOutcome::new(
                        job_id,
                        RetryStatus::Success,
                        format!("sent as {fhir_id}, but the job was already complete"),
                    )
                    .for_resource(tag)
                }
                Err(e) => {
                    log_error_with_context!(&e, "Failed to record successful retry");
                    RetryOutcome::new(
                        job_id,
                        RetryStatus::Success,
                        format!("sent, but the ledger was not updated: {e}"),
                    )
                    .for_resource(tag)
                    .with_external_id(fhir_id)
                }
            },
            Err(send_error) => {
                let message = send_error.to_string();
                if let Err(e) = self.ledger.fail_job(job_id, &message).await {
                    log_error_with_context!(&e, "Failed to record failed retry");
                }
                log_job_outcome!(job_id, tag, job.idempotency_key, "failed");
                RetryOutcome::new(job_id, RetryStatus::Failed, message)
                    .for_resource(tag)
                    .with_transient(send_error.is_transient())
            }
        }
    }

    /// Retries up to `limit` eligible failed jobs, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error only if the eligible jobs cannot be listed.
    pub async fn retry_failed(&self, limit: usize) -> Result<RetryReport> {
        let jobs = self.ledger.list_retryable(limit).await?;
        tracing::info!(eligible = jobs.len(), limit, "Retrying failed jobs");

        let mut report = RetryReport::default();
        for job in jobs {
            report.push(self.retry_one(job.id).await);
        }

        tracing::info!(
            retried = report.retried,
            succeeded = report.succeeded,
            still_failed = report.still_failed,
            "Retry sweep completed"
        );
        Ok(report)
    }
}
