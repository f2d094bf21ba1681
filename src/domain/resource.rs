//! FHIR resource kinds and documents
//!
//! [`ResourceKind`] is the closed set of resources the exchange accepts.
//! [`ResourceType`] is the tag persisted in the ledger; several tags can map
//! onto the same kind (`Observation_Lab`, `Observation_Rad`, ...), which is
//! what lets one logical record per sub-category be deduplicated on its own.
//! [`FhirDocument`] ties a JSON body to its kind so the pipeline never has to
//! guess what it is holding.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Clinical resource kinds accepted by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Encounter,
    Condition,
    Observation,
    Procedure,
    MedicationRequest,
    MedicationDispense,
}

impl ResourceKind {
    /// Every kind, in registration order
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Encounter,
        ResourceKind::Condition,
        ResourceKind::Observation,
        ResourceKind::Procedure,
        ResourceKind::MedicationRequest,
        ResourceKind::MedicationDispense,
    ];

    /// FHIR resource name, also the endpoint path segment
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Encounter => "Encounter",
            ResourceKind::Condition => "Condition",
            ResourceKind::Observation => "Observation",
            ResourceKind::Procedure => "Procedure",
            ResourceKind::MedicationRequest => "MedicationRequest",
            ResourceKind::MedicationDispense => "MedicationDispense",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown FHIR resource kind '{s}'"))
    }
}

/// Ledger tag for a submission, e.g. `Encounter` or `Observation_Lab`
///
/// # Examples
///
/// ```
/// use mera::domain::resource::{ResourceKind, ResourceType};
/// use std::str::FromStr;
///
/// let lab = ResourceType::qualified(ResourceKind::Observation, "Lab").unwrap();
/// assert_eq!(lab.tag(), "Observation_Lab");
///
/// let ranap = ResourceType::from_str("EncounterRanap").unwrap();
/// assert_eq!(ranap.kind(), ResourceKind::Encounter);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceType {
    tag: String,
    kind: ResourceKind,
}

impl ResourceType {
    /// Maximum tag length accepted by the ledger column
    pub const MAX_LEN: usize = 50;

    /// Tag equal to the bare kind name
    pub fn of(kind: ResourceKind) -> Self {
        Self {
            tag: kind.as_str().to_string(),
            kind,
        }
    }

    /// Tag of the form `{Kind}_{qualifier}`
    pub fn qualified(kind: ResourceKind, qualifier: &str) -> Result<Self, String> {
        let qualifier = qualifier.trim();
        if qualifier.is_empty() {
            return Err("Resource type qualifier cannot be empty".to_string());
        }
        Self::checked(format!("{}_{}", kind.as_str(), qualifier), kind)
    }

    fn checked(tag: String, kind: ResourceKind) -> Result<Self, String> {
        if tag.chars().count() > Self::MAX_LEN {
            return Err(format!(
                "Resource type '{tag}' exceeds {} characters",
                Self::MAX_LEN
            ));
        }
        Ok(Self { tag, kind })
    }

    /// The persisted tag
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The FHIR kind the tag dispatches to
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

impl From<ResourceKind> for ResourceType {
    fn from(kind: ResourceKind) -> Self {
        Self::of(kind)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

impl FromStr for ResourceType {
    type Err = String;

    /// Accepts `Kind`, `Kind_Qualifier` and the legacy `KindQualifier` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        let kind = ResourceKind::ALL
            .into_iter()
            .find(|k| tag.starts_with(k.as_str()))
            .ok_or_else(|| format!("Unknown resource type '{tag}'"))?;
        Self::checked(tag.to_string(), kind)
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag)
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// A FHIR resource body bound to its kind
///
/// The body is always a JSON object whose `resourceType` equals the kind's
/// name; it is inserted when absent and rejected when different.
///
/// # Examples
///
/// ```
/// use mera::domain::resource::{FhirDocument, ResourceKind};
/// use serde_json::json;
///
/// let doc = FhirDocument::new(ResourceKind::Encounter, json!({"status": "finished"})).unwrap();
/// assert_eq!(doc.to_value()["resourceType"], "Encounter");
///
/// assert!(FhirDocument::new(ResourceKind::Condition, json!({"resourceType": "Encounter"})).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FhirDocument {
    kind: ResourceKind,
    body: Map<String, Value>,
}

impl FhirDocument {
    /// Binds `body` to `kind`
    pub fn new(kind: ResourceKind, body: Value) -> Result<Self, String> {
        let mut body = match body {
            Value::Object(map) => map,
            other => {
                return Err(format!(
                    "{} document must be a JSON object, got {}",
                    kind,
                    json_type_name(&other)
                ))
            }
        };

        match body.get("resourceType") {
            None => {
                body.insert(
                    "resourceType".to_string(),
                    Value::String(kind.as_str().to_string()),
                );
            }
            Some(Value::String(declared)) if declared == kind.as_str() => {}
            Some(declared) => {
                return Err(format!(
                    "Document declares resourceType {declared} but was submitted as {kind}"
                ))
            }
        }

        Ok(Self { kind, body })
    }

    /// Restores a document from a ledger payload
    pub fn from_stored(kind: ResourceKind, payload: &Value) -> Result<Self, String> {
        Self::new(kind, payload.clone()).map_err(|e| format!("Invalid stored payload: {e}"))
    }

    /// Kind of this document
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The JSON object
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Owned JSON value of the body
    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }
}

impl Serialize for FhirDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("Encounter", ResourceKind::Encounter ; "bare encounter")]
    #[test_case("EncounterRanap", ResourceKind::Encounter ; "legacy inpatient encounter")]
    #[test_case("Condition", ResourceKind::Condition ; "condition")]
    #[test_case("Observation_Lab", ResourceKind::Observation ; "lab observation")]
    #[test_case("Observation_Rad", ResourceKind::Observation ; "radiology observation")]
    #[test_case("Observation_nadi", ResourceKind::Observation ; "vital sign observation")]
    #[test_case("Procedure", ResourceKind::Procedure ; "procedure")]
    #[test_case("MedicationRequest", ResourceKind::MedicationRequest ; "medication request")]
    #[test_case("MedicationDispense", ResourceKind::MedicationDispense ; "medication dispense")]
    fn test_resource_type_parses_to_kind(tag: &str, expected: ResourceKind) {
        let parsed = ResourceType::from_str(tag).unwrap();
        assert_eq!(parsed.kind(), expected);
        assert_eq!(parsed.tag(), tag);
    }

    #[test]
    fn test_unknown_resource_type_rejected() {
        assert!(ResourceType::from_str("Patient").is_err());
        assert!(ResourceType::from_str("").is_err());
    }

    #[test]
    fn test_qualified_resource_type() {
        let rad = ResourceType::qualified(ResourceKind::Observation, "Rad").unwrap();
        assert_eq!(rad.tag(), "Observation_Rad");
        assert!(ResourceType::qualified(ResourceKind::Observation, " ").is_err());
        assert!(ResourceType::qualified(ResourceKind::Observation, &"x".repeat(60)).is_err());
    }

    #[test]
    fn test_resource_kind_round_trips_through_display() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.to_string().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_document_inserts_resource_type() {
        let doc = FhirDocument::new(ResourceKind::Procedure, json!({"status": "completed"})).unwrap();
        assert_eq!(doc.body()["resourceType"], "Procedure");
        assert_eq!(doc.kind(), ResourceKind::Procedure);
    }

    #[test]
    fn test_document_rejects_non_object() {
        let err = FhirDocument::new(ResourceKind::Encounter, json!([1, 2])).unwrap_err();
        assert!(err.contains("an array"));
    }

    #[test]
    fn test_document_serializes_as_body() {
        let doc = FhirDocument::new(
            ResourceKind::Observation,
            json!({"resourceType": "Observation", "status": "final"}),
        )
        .unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        let restored = FhirDocument::from_stored(ResourceKind::Observation, &value).unwrap();
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_from_stored_rejects_mismatched_payload() {
        let err = FhirDocument::from_stored(ResourceKind::Encounter, &json!("just text")).unwrap_err();
        assert!(err.starts_with("Invalid stored payload"));
        assert!(FhirDocument::from_stored(ResourceKind::Encounter, &json!({"resourceType": "Procedure"})).is_err());
    }
}
