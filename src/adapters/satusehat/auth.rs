//! OAuth2 client-credentials token cache
//!
//! One [`TokenProvider`] is built at startup and shared (as an `Arc`) by every
//! component that talks to the exchange. Readers take the fast path under a
//! read lock; a refresh holds the write lock for the whole exchange so that
//! callers arriving meanwhile wait for it instead of issuing their own.

use super::models::TokenResponse;
use super::{endpoint, http_client};
use crate::config::{SatuSehatConfig, SecretString};
use crate::domain::{BridgeError, FhirError, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use secrecy::ExposeSecret;
use tokio::sync::RwLock;

/// A bearer token and the instant it stops being handed out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Usable strictly before `expires_at`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Time left before the token must be refreshed
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }
}

/// Process-wide access token cache for the exchange
pub struct TokenProvider {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    safety_margin: Duration,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenProvider {
    /// Creates a provider with an empty cache
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] if the HTTP client cannot be built
    pub fn new(config: &SatuSehatConfig) -> Result<Self> {
        Ok(Self::with_client(http_client(config)?, config))
    }

    /// Creates a provider that shares an existing HTTP client
    pub fn with_client(http: Client, config: &SatuSehatConfig) -> Self {
        Self {
            http,
            token_url: endpoint(&config.auth_url, "accesstoken"),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            safety_margin: Duration::seconds(config.token_safety_margin_seconds as i64),
            cache: RwLock::new(None),
        }
    }

    /// Returns a valid access token, exchanging credentials if needed
    ///
    /// At most one exchange is in flight at any time. On failure the previous
    /// cache entry (if any) is left as it was and the error is returned
    /// without retrying.
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.cache.read().await;
            if let Some(token) = cache.as_ref() {
                if token.is_valid_at(Utc::now()) {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = cache.as_ref() {
            if token.is_valid_at(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cache = Some(fresh);
        Ok(value)
    }

    /// Snapshot of the cached token, valid or not
    pub async fn cached_token(&self) -> Option<CachedToken> {
        self.cache.read().await.clone()
    }

    /// Drops the cached token so the next [`get_token`](Self::get_token)
    /// performs an exchange
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        if cache.take().is_some() {
            tracing::debug!("Access token invalidated");
        }
    }

    async fn exchange(&self) -> Result<CachedToken> {
        tracing::debug!(
            token_url = %self.token_url,
            client_id = %self.client_id,
            "Requesting access token with client credentials"
        );

        let client_secret: &str = self.client_secret.expose_secret().as_str();
        let requested_at = Utc::now();
        let response = self
            .http
            .post(&self.token_url)
            .query(&[("grant_type", "client_credentials")])
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(FhirError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Token request rejected");
            return Err(BridgeError::Authentication(format!(
                "Token request failed with status {status}: {body}"
            )));
        }

        let body = response.text().await.map_err(FhirError::from)?;
        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            BridgeError::Authentication(format!("Failed to parse token response: {e}"))
        })?;

        if parsed.access_token.is_empty() {
            return Err(BridgeError::Authentication(
                "Token response carried no access_token".to_string(),
            ));
        }

        let expires_at = token_expiry(requested_at, parsed.expires_in, self.safety_margin)
            .ok_or_else(|| {
                BridgeError::Authentication(format!(
                    "Token response expires_in out of range: {}",
                    parsed.expires_in
                ))
            })?;

        tracing::info!(
            expires_in = parsed.expires_in,
            expires_at = %expires_at,
            "Access token acquired"
        );

        Ok(CachedToken {
            value: parsed.access_token,
            expires_at,
        })
    }
}

/// `requested_at + expires_in - margin`, or `None` if it leaves the
/// representable range
fn token_expiry(
    requested_at: DateTime<Utc>,
    expires_in: u64,
    margin: Duration,
) -> Option<DateTime<Utc>> {
    let lifetime = Duration::try_seconds(i64::try_from(expires_in).ok()?)?;
    requested_at
        .checked_add_signed(lifetime)?
        .checked_sub_signed(margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    fn config(auth_url: String) -> SatuSehatConfig {
        SatuSehatConfig {
            auth_url,
            fhir_url: "http://127.0.0.1:9/fhir-r4/v1".to_string(),
            client_id: "mera-client".to_string(),
            client_secret: secret_string("mera-secret".to_string()),
            identity_system: "https://fhir.kemkes.go.id/id/nik".to_string(),
            timeout_seconds: 5,
            token_safety_margin_seconds: 60,
            tls_verify: true,
        }
    }

    async fn token_mock(server: &mut Server, body: &str, hits: usize) -> mockito::Mock {
        server
            .mock("POST", "/oauth2/v1/accesstoken")
            .match_query(Matcher::UrlEncoded(
                "grant_type".into(),
                "client_credentials".into(),
            ))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "mera-client".into()),
                Matcher::UrlEncoded("client_secret".into(), "mera-secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_first_call_exchanges_credentials() {
        let mut server = Server::new_async().await;
        let mock = token_mock(
            &mut server,
            r#"{"access_token":"T1","expires_in":"3599","token_type":"BearerToken"}"#,
            1,
        )
        .await;

        let provider = TokenProvider::new(&config(format!("{}/oauth2/v1", server.url()))).unwrap();
        assert_eq!(provider.get_token().await.unwrap(), "T1");
        assert_eq!(provider.get_token().await.unwrap(), "T1");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let mut server = Server::new_async().await;
        let mock = token_mock(&mut server, r#"{"access_token":"T1","expires_in":"3599"}"#, 1).await;

        let provider = Arc::new(
            TokenProvider::new(&config(format!("{}/oauth2/v1", server.url()))).unwrap(),
        );

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move { provider.get_token().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "T1");
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_with_margin() {
        let mut server = Server::new_async().await;
        let mock = token_mock(&mut server, r#"{"access_token":"T2","expires_in":"3599"}"#, 1).await;

        let provider = TokenProvider::new(&config(format!("{}/oauth2/v1", server.url()))).unwrap();
        *provider.cache.write().await = Some(CachedToken {
            value: "T1".to_string(),
            expires_at: Utc::now() - Duration::seconds(1),
        });

        assert_eq!(provider.get_token().await.unwrap(), "T2");

        let cached = provider.cached_token().await.unwrap();
        let remaining = cached.remaining(Utc::now()).num_seconds();
        assert!(
            (3537..=3539).contains(&remaining),
            "remaining validity was {remaining}s"
        );

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_callers_refresh_expired_token_once() {
        let mut server = Server::new_async().await;
        let mock = token_mock(&mut server, r#"{"access_token":"NEW","expires_in":"3600"}"#, 1).await;

        let provider = Arc::new(
            TokenProvider::new(&config(format!("{}/oauth2/v1", server.url()))).unwrap(),
        );
        *provider.cache.write().await = Some(CachedToken {
            value: "OLD".to_string(),
            expires_at: Utc::now() - Duration::seconds(1),
        });

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move { provider.get_token().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "NEW");
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lifetime_is_shortened_by_safety_margin() {
        let mut server = Server::new_async().await;
        let _mock = token_mock(&mut server, r#"{"access_token":"abc","expires_in":"3600"}"#, 1).await;

        let provider = TokenProvider::new(&config(format!("{}/oauth2/v1", server.url()))).unwrap();
        let before = Utc::now();
        assert_eq!(provider.get_token().await.unwrap(), "abc");
        let after = Utc::now();

        let expires_at = provider.cached_token().await.unwrap().expires_at;
        assert!(expires_at - before >= Duration::seconds(3540));
        assert!(expires_at - after <= Duration::seconds(3540));
        assert!(expires_at - before <= Duration::seconds(3543));
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_keeps_existing_cache() {
        let mut server = Server::new_async().await;
        let _mock = token_mock(
            &mut server,
            r#"{"access_token":"T1","expires_in":"10000000000000"}"#,
            1,
        )
        .await;

        let provider = TokenProvider::new(&config(format!("{}/oauth2/v1", server.url()))).unwrap();
        let stale = CachedToken {
            value: "T0".to_string(),
            expires_at: Utc::now() - Duration::seconds(5),
        };
        *provider.cache.write().await = Some(stale.clone());

        let err = provider.get_token().await.unwrap_err();
        assert!(matches!(err, BridgeError::Authentication(_)));
        assert!(err.to_string().contains("expires_in out of range"));
        assert_eq!(provider.cached_token().await, Some(stale));
    }

    #[test]
    fn test_token_expiry_rejects_unrepresentable_lifetimes() {
        let now = Utc::now();
        let margin = Duration::seconds(60);
        assert_eq!(
            token_expiry(now, 3600, margin),
            Some(now + Duration::seconds(3540))
        );
        assert!(token_expiry(now, 10_000_000_000_000, margin).is_none());
        assert!(token_expiry(now, i64::MAX as u64, margin).is_none());
        assert!(token_expiry(now, u64::MAX, margin).is_none());
    }

    #[tokio::test]
    async fn test_failed_exchange_keeps_existing_cache() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/v1/accesstoken")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"fault":"invalid client"}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = TokenProvider::new(&config(format!("{}/oauth2/v1", server.url()))).unwrap();
        let stale = CachedToken {
            value: "T1".to_string(),
            expires_at: Utc::now() - Duration::seconds(5),
        };
        *provider.cache.write().await = Some(stale.clone());

        let err = provider.get_token().await.unwrap_err();
        assert!(matches!(err, BridgeError::Authentication(_)));
        assert_eq!(provider.cached_token().await, Some(stale));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_lifetime_is_an_authentication_error() {
        let mut server = Server::new_async().await;
        let _mock =
            token_mock(&mut server, r#"{"access_token":"T1","expires_in":"later"}"#, 1).await;

        let provider = TokenProvider::new(&config(format!("{}/oauth2/v1", server.url()))).unwrap();
        let err = provider.get_token().await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse token response"));
        assert!(provider.cached_token().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_exchange() {
        let mut server = Server::new_async().await;
        let mock = token_mock(&mut server, r#"{"access_token":"T1","expires_in":3599}"#, 2).await;

        let provider = TokenProvider::new(&config(format!("{}/oauth2/v1", server.url()))).unwrap();
        provider.get_token().await.unwrap();
        provider.invalidate().await;
        assert!(provider.cached_token().await.is_none());
        provider.get_token().await.unwrap();

        mock.assert_async().await;
    }

    #[test]
    fn test_cached_token_validity_is_strict() {
        let now = Utc::now();
        let token = CachedToken {
            value: "T".to_string(),
            expires_at: now,
        };
        assert!(!token.is_valid_at(now));
        assert!(token.is_valid_at(now - Duration::seconds(1)));
    }
}
