//! Logging and observability
//!
//! Structured logging via `tracing`, plus a few macros that keep the field
//! names of job events consistent between the submit and retry paths.
//!
//! # Example
//!
//! ```no_run
//! use mera::logging::init_logging;
//! use mera::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(resource_type = "Encounter", "Submitting");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the outcome of a single send recorded against a job
///
/// # Example
///
/// ```no_run
/// use mera::log_job_outcome;
///
/// log_job_outcome!(17, "Encounter", "R1", "success");
/// ```
#[macro_export]
macro_rules! log_job_outcome {
    ($job_id:expr, $resource_type:expr, $key:expr, $outcome:expr) => {
        tracing::info!(
            job_id = %$job_id,
            resource_type = %$resource_type,
            idempotency_key = %$key,
            outcome = $outcome,
            "Job outcome recorded"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use mera::log_error_with_context;
/// use mera::domain::BridgeError;
///
/// let error = BridgeError::Database("connection reset".to_string());
/// log_error_with_context!(&error, "Failed to record job outcome");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt of a failed job
///
/// # Example
///
/// ```no_run
/// use mera::log_retry_attempt;
///
/// log_retry_attempt!(42, 2, 3);
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($job_id:expr, $attempt:expr, $max_attempts:expr) => {
        tracing::info!(
            job_id = %$job_id,
            attempt = $attempt,
            max_attempts = $max_attempts,
            "Retrying job"
        );
    };
}
