//! Batch submission summary

use super::submitter::Submission;
use crate::domain::{BridgeError, FhirId, IdempotencyKey};
use serde::Serialize;

/// Per-item failure in a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchError {
    pub idempotency_key: String,
    pub message: String,
}

/// Aggregated outcome of a batch of submissions
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    pub sent_ids: Vec<FhirId>,
    pub errors: Vec<BatchError>,
}

impl BatchReport {
    /// Adds one item's result
    pub fn record(&mut self, key: &IdempotencyKey, result: Result<Submission, BridgeError>) {
        match result {
            Ok(Submission::Sent(id)) => {
                self.sent += 1;
                self.sent_ids.push(id);
            }
            Ok(Submission::Skipped) => self.skipped += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push(BatchError {
                    idempotency_key: key.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    pub fn total(&self) -> usize {
        self.sent + self.skipped + self.failed
    }

    pub fn is_successful(&self) -> bool {
        self.failed == 0
    }

    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total(),
            sent = self.sent,
            skipped = self.skipped,
            failed = self.failed,
            "Batch submission completed"
        );
        for error in &self.errors {
            tracing::warn!(
                idempotency_key = %error.idempotency_key,
                message = %error.message,
                "Batch item failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_each_outcome() {
        let mut report = BatchReport::default();
        let key = IdempotencyKey::new("R1").unwrap();

        report.record(&key, Ok(Submission::Sent(FhirId::new("x").unwrap())));
        report.record(&key, Ok(Submission::Skipped));
        report.record(&key, Err(BridgeError::Authentication("denied".to_string())));

        assert_eq!(report.total(), 3);
        assert_eq!(report.sent_ids.len(), 1);
        assert!(!report.is_successful());
        assert_eq!(report.errors[0].idempotency_key, "R1");
        assert!(report.errors[0].message.contains("denied"));
    }
}
