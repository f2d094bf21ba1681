//! Domain error types
//!
//! This module defines the error hierarchy for Mera.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Mera error type
///
/// This is the primary error type used throughout the bridge.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// FHIR exchange errors (sends, lookups, token endpoint transport)
    #[error("FHIR error: {0}")]
    Fhir(#[from] FhirError),

    /// Job ledger storage errors
    #[error("Database error: {0}")]
    Database(String),

    /// Token acquisition errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    /// Whether a later retry of the same operation may succeed
    ///
    /// Send failures caused by the network or a 5xx/429 answer are transient.
    /// Everything else needs a change in data or configuration first.
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::Fhir(e) => e.is_transient(),
            BridgeError::Database(_) => true,
            _ => false,
        }
    }
}

/// FHIR exchange errors
///
/// Errors that occur when talking to the SATUSEHAT endpoints.
/// These errors don't expose the HTTP client's types.
#[derive(Debug, Error)]
pub enum FhirError {
    /// Failed to reach the server
    #[error("Failed to connect to FHIR server: {0}")]
    ConnectionFailed(String),

    /// Response body could not be understood
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 2xx answer without a resource id
    #[error("{resource} send failed: response carried no id ({body})")]
    MissingResourceId { resource: String, body: String },
}

impl FhirError {
    /// Whether the failure is worth retrying later
    pub fn is_transient(&self) -> bool {
        match self {
            FhirError::ConnectionFailed(_) | FhirError::Timeout(_) => true,
            FhirError::ServerError { .. } => true,
            FhirError::ClientError { status, .. } => *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FhirError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FhirError::Timeout(err.to_string())
        } else if err.is_decode() {
            FhirError::InvalidResponse(err.to_string())
        } else {
            FhirError::ConnectionFailed(err.to_string())
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for BridgeError {
    fn from(err: toml::de::Error) -> Self {
        BridgeError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<tokio_postgres::Error> for BridgeError {
    fn from(err: tokio_postgres::Error) -> Self {
        BridgeError::Database(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for BridgeError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        BridgeError::Database(format!("Failed to get connection from pool: {err}"))
    }
}
