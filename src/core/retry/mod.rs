//! Retry of failed submissions
//!
//! - [`RetryEngine`] - re-sends a job or a sweep of failed jobs
//! - [`SenderRegistry`] - resource kind to sender dispatch
//! - [`RetryOutcome`] / [`RetryReport`] - what happened

pub mod engine;
pub mod registry;
pub mod report;

pub use engine::RetryEngine;
pub use registry::{SenderRegistry, SenderRegistryBuilder};
pub use report::{RetryOutcome, RetryReport, RetryStatus};
