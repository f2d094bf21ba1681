//! Wire models for the SATUSEHAT OAuth2 and FHIR endpoints

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Client-credentials token response
///
/// The gateway encodes `expires_in` as a string (`"3599"`); a bare number is
/// accepted as well.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: String,

    #[serde(deserialize_with = "lifetime_seconds")]
    pub expires_in: u64,
}

fn lifetime_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lifetime {
        Number(u64),
        Text(String),
    }

    match Lifetime::deserialize(deserializer)? {
        Lifetime::Number(n) => Ok(n),
        Lifetime::Text(s) => s.trim().parse().map_err(|e| {
            serde::de::Error::custom(format!("expires_in '{s}' is not a number of seconds: {e}"))
        }),
    }
}

/// Body returned by a successful create; only the id matters
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedResource {
    #[serde(default)]
    pub id: Option<String>,
}

/// Search result bundle
#[derive(Debug, Deserialize)]
pub(crate) struct Bundle {
    #[serde(default)]
    pub total: Option<u64>,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BundleEntry {
    #[serde(default)]
    pub resource: Option<Value>,
}

impl Bundle {
    /// Id of the first matched resource, if the search found anything
    pub fn first_id(&self) -> Option<String> {
        if self.total == Some(0) {
            return None;
        }
        self.entry
            .iter()
            .filter_map(|e| e.resource.as_ref())
            .filter_map(|r| r.get("id").and_then(Value::as_str))
            .find(|id| !id.trim().is_empty())
            .map(str::to_string)
    }
}
