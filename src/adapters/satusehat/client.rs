//! Authenticated FHIR client for the exchange
//!
//! Every call asks the shared [`TokenProvider`] for a bearer token first. A
//! `401` from the FHIR endpoint drops the cached token so the next call
//! re-authenticates; the failing call itself is not retried here.

use super::auth::TokenProvider;
use super::models::{Bundle, CreatedResource};
use super::{endpoint, http_client};
use crate::config::SatuSehatConfig;
use crate::domain::{BridgeError, FhirDocument, FhirError, FhirId, ResourceKind, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;

/// Something that can deliver a document and report the id it was given
#[async_trait]
pub trait ResourceSender: Send + Sync {
    async fn send(&self, document: &FhirDocument) -> Result<FhirId>;
}

/// FHIR client bound to one gateway
pub struct FhirClient {
    http: Client,
    fhir_url: String,
    identity_system: String,
    tokens: Arc<TokenProvider>,
}

impl FhirClient {
    /// Creates a client that authenticates through `tokens`
    pub fn new(config: &SatuSehatConfig, tokens: Arc<TokenProvider>) -> Result<Self> {
        Ok(Self {
            http: http_client(config)?,
            fhir_url: config.fhir_url.clone(),
            identity_system: config.identity_system.clone(),
            tokens,
        })
    }

    /// The token provider this client authenticates with
    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    /// Creates `document` on the server and returns its assigned id
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Authentication`] if no token could be obtained
    /// - [`FhirError::ClientError`] / [`FhirError::ServerError`] for non-2xx answers
    /// - [`FhirError::MissingResourceId`] for a 2xx answer without `id`
    pub async fn create(&self, document: &FhirDocument) -> Result<FhirId> {
        let kind = document.kind();
        let url = endpoint(&self.fhir_url, kind.as_str());
        let token = self.tokens.get_token().await?;

        tracing::debug!(resource = %kind, url = %url, "Posting FHIR resource");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(document)
            .send()
            .await
            .map_err(FhirError::from)?;

        let body = self.read_success(response).await?;

        let created: CreatedResource = serde_json::from_str(&body).map_err(|e| {
            FhirError::InvalidResponse(format!("{kind} response is not valid JSON: {e}"))
        })?;

        match created.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                tracing::debug!(resource = %kind, fhir_id = %id, "FHIR resource created");
                FhirId::new(id).map_err(BridgeError::Validation)
            }
            None => Err(FhirError::MissingResourceId {
                resource: kind.to_string(),
                body,
            }
            .into()),
        }
    }

    /// Resolves a patient's FHIR id from a national identity number
    pub async fn lookup_patient(&self, nik: &str) -> Result<FhirId> {
        self.lookup_by_identity("Patient", nik).await
    }

    /// Resolves a practitioner's FHIR id from a national identity number
    pub async fn lookup_practitioner(&self, nik: &str) -> Result<FhirId> {
        self.lookup_by_identity("Practitioner", nik).await
    }

    async fn lookup_by_identity(&self, resource: &str, nik: &str) -> Result<FhirId> {
        let nik = nik.trim();
        if nik.is_empty() {
            return Err(BridgeError::Validation(format!(
                "{resource} lookup needs an identity number"
            )));
        }

        let url = endpoint(&self.fhir_url, resource);
        let token = self.tokens.get_token().await?;

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("identifier", format!("{}|{}", self.identity_system, nik))])
            .send()
            .await
            .map_err(FhirError::from)?;

        let body = self.read_success(response).await?;
        let bundle: Bundle = serde_json::from_str(&body).map_err(|e| {
            FhirError::InvalidResponse(format!("{resource} search returned an invalid bundle: {e}"))
        })?;

        let id = bundle
            .first_id()
            .ok_or_else(|| BridgeError::NotFound(format!("{resource} not found for identifier")))?;

        FhirId::new(id).map_err(BridgeError::Validation)
    }

    /// Returns the body of a 2xx response, or maps the status to an error
    async fn read_success(&self, response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await.map_err(FhirError::from)?;

        if status.is_success() {
            return Ok(body);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }

        Err(status_error(status, body).into())
    }
}

fn status_error(status: StatusCode, body: String) -> FhirError {
    if status.is_server_error() {
        FhirError::ServerError {
            status: status.as_u16(),
            message: body,
        }
    } else {
        FhirError::ClientError {
            status: status.as_u16(),
            message: body,
        }
    }
}

/// Sender that posts one kind of resource through a shared [`FhirClient`]
pub struct ResourceEndpoint {
    client: Arc<FhirClient>,
    kind: ResourceKind,
}

impl ResourceEndpoint {
    pub fn new(client: Arc<FhirClient>, kind: ResourceKind) -> Self {
        Self { client, kind }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

#[async_trait]
impl ResourceSender for ResourceEndpoint {
    async fn send(&self, document: &FhirDocument) -> Result<FhirId> {
        if document.kind() != self.kind {
            return Err(BridgeError::Validation(format!(
                "{} endpoint cannot send a {} document",
                self.kind,
                document.kind()
            )));
        }
        self.client.create(document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_classification() {
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "down".to_string()),
            FhirError::ServerError { status: 502, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "bad".to_string()),
            FhirError::ClientError { status: 400, .. }
        ));
    }
}
