//! Configuration management for Mera.
//!
//! Mera reads a single TOML file (default `mera.toml`) with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `MERA_<SECTION>_<KEY>` overrides applied after parsing
//! - Default values for optional settings
//! - Validation on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`SatuSehatConfig`] - OAuth2 and FHIR endpoints, credentials, timeouts
//! - [`PostgreSQLConfig`] - Job ledger database
//! - [`JobsConfig`] - Retry cap and batch limits
//! - [`LoggingConfig`] - Optional JSON log files
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [application]
//! log_level = "info"
//!
//! [satusehat]
//! auth_url = "https://api-satusehat.kemkes.go.id/oauth2/v1"
//! fhir_url = "https://api-satusehat.kemkes.go.id/fhir-r4/v1"
//! client_id = "${SATUSEHAT_CLIENT_ID}"
//! client_secret = "${SATUSEHAT_CLIENT_SECRET}"
//!
//! [postgresql]
//! connection_string = "${MERA_DATABASE_URL}"
//!
//! [jobs]
//! max_retries = 3
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, Environment, JobsConfig, LoggingConfig, MeraConfig, PostgreSQLConfig,
    SatuSehatConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
