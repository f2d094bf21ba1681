//! Idempotent submission
//!
//! The ledger row is created before anything is sent. Whoever creates it owns
//! the send; everyone else gets [`Submission::Skipped`]. The row is never
//! deleted, so a record is offered to the exchange at most once through this
//! path no matter how the send ends.

use crate::adapters::satusehat::ResourceSender;
use crate::core::ledger::JobLedger;
use crate::core::retry::SenderRegistry;
use crate::core::submit::report::BatchReport;
use crate::domain::{CreateOutcome, FhirDocument, FhirId, IdempotencyKey, ResourceType, Result};
use crate::{log_error_with_context, log_job_outcome};
use std::sync::Arc;

/// What happened to a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Delivered now; carries the id assigned by the exchange
    Sent(FhirId),
    /// A job for this record already exists; nothing was sent
    Skipped,
}

/// One item of a batch submission
#[derive(Debug, Clone)]
pub struct SubmissionItem {
    pub resource_type: ResourceType,
    pub key: IdempotencyKey,
    pub document: FhirDocument,
}

/// Runs submissions against the job ledger
pub struct Submitter {
    ledger: Arc<JobLedger>,
}

impl Submitter {
    pub fn new(ledger: Arc<JobLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<JobLedger> {
        &self.ledger
    }

    /// Submits `document` at most once for `(resource_type, key)`
    ///
    /// # Errors
    ///
    /// Returns the send error when the exchange call fails (the job is
    /// recorded as failed first), or the ledger error when the job could not
    /// be registered. A ledger write failing after the send is logged and
    /// does not change the result.
    pub async fn submit<S>(
        &self,
        resource_type: &ResourceType,
        key: &IdempotencyKey,
        document: &FhirDocument,
        sender: &S,
    ) -> Result<Submission>
    where
        S: ResourceSender + ?Sized,
    {
        let job_id = match self.ledger.create_job(resource_type, key, document).await? {
            CreateOutcome::Created(id) => id,
            CreateOutcome::Duplicate => {
                tracing::debug!(
                    resource_type = %resource_type,
                    idempotency_key = %key,
                    "Job already registered, skipping send"
                );
                return Ok(Submission::Skipped);
            }
        };

        match sender.send(document).await {
            Ok(fhir_id) => {
                if let Err(e) = self.ledger.complete_job(job_id, &fhir_id).await {
                    log_error_with_context!(&e, "Failed to record successful send");
                }
                log_job_outcome!(job_id, resource_type, key, "success");
                Ok(Submission::Sent(fhir_id))
            }
            Err(send_error) => {
                if let Err(e) = self.ledger.fail_job(job_id, &send_error.to_string()).await {
                    log_error_with_context!(&e, "Failed to record failed send");
                }
                tracing::warn!(
                    job_id = %job_id,
                    resource_type = %resource_type,
                    idempotency_key = %key,
                    error = %send_error,
                    transient = send_error.is_transient(),
                    "Send failed"
                );
                Err(send_error)
            }
        }
    }

    /// [`submit`](Self::submit) through the registered sender for the
    /// document's kind
    pub async fn submit_with(
        &self,
        registry: &SenderRegistry,
        resource_type: &ResourceType,
        key: &IdempotencyKey,
        document: &FhirDocument,
    ) -> Result<Submission> {
        let sender = registry.sender(document.kind())?;
        self.submit(resource_type, key, document, sender.as_ref())
            .await
    }

    /// Submits items one after another; a failed item does not stop the rest
    pub async fn submit_all(
        &self,
        registry: &SenderRegistry,
        items: &[SubmissionItem],
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for item in items {
            let result = self
                .submit_with(registry, &item.resource_type, &item.key, &item.document)
                .await;
            report.record(&item.key, result);
        }
        report.log_summary();
        report
    }
}
