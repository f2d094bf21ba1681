//! Core business logic for Mera.
//!
//! # Modules
//!
//! - [`ledger`] - Job ledger facade with the retry cap
//! - [`submit`] - Idempotent submission and batch reports
//! - [`retry`] - Retry engine and the sender registry
//!
//! # Submission Workflow
//!
//! 1. **Register**: insert a `pending` job keyed by `(resource_type, idempotency_key)`
//! 2. **Skip**: a duplicate key means someone else owns the send
//! 3. **Send**: post the document through the sender for its kind
//! 4. **Record**: mark the job `success` with the FHIR id, or `failed` with the error
//! 5. **Retry** (on demand): re-send failed jobs under the retry cap

pub mod ledger;
pub mod retry;
pub mod submit;

pub use ledger::{JobLedger, JobListing};
pub use retry::{RetryEngine, RetryOutcome, RetryReport, RetryStatus, SenderRegistry};
pub use submit::{BatchReport, Submission, SubmissionItem, Submitter};
