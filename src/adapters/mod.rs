//! External system integrations for Mera.
//!
//! - [`satusehat`] - OAuth2 token cache and FHIR client for the exchange
//! - [`ledger`] - Job ledger storage (trait, PostgreSQL and in-memory stores)

pub mod ledger;
pub mod satusehat;
