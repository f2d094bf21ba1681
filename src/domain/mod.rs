//! Domain models and types for Mera.
//!
//! This module contains the types every layer shares: identifiers, resource
//! kinds and documents, the job ledger row, and the error hierarchy.
//!
//! # Overview
//!
//! - **Strongly-typed identifiers** ([`JobId`], [`IdempotencyKey`], [`FhirId`])
//! - **Resources** ([`ResourceKind`], [`ResourceType`], [`FhirDocument`])
//! - **Ledger rows** ([`Job`], [`JobStatus`], [`JobFilter`])
//! - **Error types** ([`BridgeError`], [`FhirError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! ```rust
//! use mera::domain::{FhirDocument, IdempotencyKey, ResourceKind, ResourceType};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resource_type = ResourceType::qualified(ResourceKind::Observation, "Lab")?;
//! let key = IdempotencyKey::from_parts(&["ORD-7781", "KIMIA-01"])?;
//! let document = FhirDocument::new(resource_type.kind(), json!({"status": "final"}))?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod job;
pub mod resource;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{BridgeError, FhirError};
pub use ids::{FhirId, IdempotencyKey, JobId};
pub use job::{CreateOutcome, Job, JobFilter, JobStatus, DEFAULT_LIST_LIMIT, DEFAULT_MAX_RETRIES};
pub use resource::{FhirDocument, ResourceKind, ResourceType};
pub use result::Result;
