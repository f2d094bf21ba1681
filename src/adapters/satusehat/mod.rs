//! SATUSEHAT exchange adapter
//!
//! - [`TokenProvider`] - process-wide OAuth2 client-credentials token cache
//! - [`FhirClient`] - authenticated FHIR create and identity lookups
//! - [`ResourceSender`] - the seam the submission pipeline sends through
//!
//! ```rust,no_run
//! use mera::adapters::satusehat::{FhirClient, TokenProvider};
//! use mera::config::load_config;
//! use std::sync::Arc;
//!
//! # async fn example() -> mera::domain::Result<()> {
//! let config = load_config("mera.toml")?;
//! let tokens = Arc::new(TokenProvider::new(&config.satusehat)?);
//! let client = FhirClient::new(&config.satusehat, tokens)?;
//! let patient = client.lookup_patient("3171022809990001").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
mod models;

pub use auth::{CachedToken, TokenProvider};
pub use client::{FhirClient, ResourceEndpoint, ResourceSender};

use crate::config::SatuSehatConfig;
use crate::domain::{BridgeError, Result};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Builds the HTTP client shared by the token and FHIR calls
pub(crate) fn http_client(config: &SatuSehatConfig) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.timeout_seconds.min(10)));

    if !config.tls_verify {
        tracing::warn!(
            fhir_url = %config.fhir_url,
            "TLS certificate verification is DISABLED for the SATUSEHAT endpoints; \
            only use this against a development gateway"
        );
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| BridgeError::Configuration(format!("Failed to build HTTP client: {e}")))
}

/// `base` without trailing slashes joined with `path`
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
