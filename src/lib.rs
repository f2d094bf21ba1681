// Mera - Idempotent FHIR submission bridge for SATUSEHAT
// Copyright (c) 2025 Mera Contributors
// Licensed under the MIT License

//! # Mera - Idempotent FHIR submission bridge
//!
//! Mera sits between a hospital information system and the national SATUSEHAT
//! FHIR exchange. Every clinical record is registered in a PostgreSQL job
//! ledger before it is sent, so the same record is offered to the exchange at
//! most once, and every failure is kept for inspection and retry.
//!
//! ## Overview
//!
//! This library provides:
//! - **Authenticating** against the exchange with a shared, cached OAuth2 token
//! - **Submitting** FHIR resources exactly once per `(resource_type, idempotency_key)`
//! - **Recording** every attempt with its outcome in the job ledger
//! - **Retrying** failed jobs on demand, up to a fixed number of attempts
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (ledger facade, submission, retry)
//! - [`adapters`] - External integrations (SATUSEHAT, PostgreSQL)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mera::adapters::ledger::create_job_store;
//! use mera::adapters::satusehat::{FhirClient, TokenProvider};
//! use mera::config::load_config;
//! use mera::core::{JobLedger, SenderRegistry, Submission, Submitter};
//! use mera::domain::{FhirDocument, IdempotencyKey, ResourceKind, ResourceType};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("mera.toml")?;
//!
//!     let ledger = Arc::new(JobLedger::new(
//!         create_job_store(&config)?,
//!         config.jobs.max_retries,
//!     ));
//!     let tokens = Arc::new(TokenProvider::new(&config.satusehat)?);
//!     let client = Arc::new(FhirClient::new(&config.satusehat, tokens)?);
//!     let registry = SenderRegistry::for_client(client);
//!
//!     let encounter = FhirDocument::new(
//!         ResourceKind::Encounter,
//!         json!({"status": "arrived", "class": {"code": "AMB"}}),
//!     )?;
//!     let key = IdempotencyKey::from_parts(&["2024/01/05/000123"])?;
//!
//!     let submitter = Submitter::new(ledger);
//!     match submitter
//!         .submit_with(&registry, &ResourceType::of(ResourceKind::Encounter), &key, &encounter)
//!         .await?
//!     {
//!         Submission::Sent(id) => println!("Created Encounter/{id}"),
//!         Submission::Skipped => println!("Already submitted"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Retrying
//!
//! Failed jobs keep the exact payload that was sent. The retry engine
//! re-sends it and updates the same row; nothing is re-derived from the
//! source system.
//!
//! ```rust,no_run
//! use mera::core::{JobLedger, RetryEngine, SenderRegistry};
//! use std::sync::Arc;
//!
//! # async fn example(ledger: Arc<JobLedger>, registry: Arc<SenderRegistry>) -> mera::domain::Result<()> {
//! let engine = RetryEngine::new(ledger, registry);
//! let report = engine.retry_failed(100).await?;
//! println!("{} succeeded, {} still failed", report.succeeded, report.still_failed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`], whose error is
//! [`domain::BridgeError`]. Exchange failures are carried as
//! [`domain::FhirError`] inside it.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
