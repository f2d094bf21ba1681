//! Idempotent submission pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use mera::core::{JobLedger, SenderRegistry, Submission, Submitter};
//! use mera::domain::{FhirDocument, IdempotencyKey, ResourceKind, ResourceType};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     ledger: Arc<JobLedger>,
//! #     registry: SenderRegistry,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let submitter = Submitter::new(ledger);
//! let document = FhirDocument::new(ResourceKind::Encounter, json!({"status": "finished"}))?;
//! let key = IdempotencyKey::from_parts(&["2024/01/05/000123"])?;
//!
//! match submitter
//!     .submit_with(&registry, &ResourceType::of(ResourceKind::Encounter), &key, &document)
//!     .await?
//! {
//!     Submission::Sent(id) => println!("created {id}"),
//!     Submission::Skipped => println!("already submitted"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod report;
pub mod submitter;

pub use report::{BatchError, BatchReport};
pub use submitter::{Submission, SubmissionItem, Submitter};
