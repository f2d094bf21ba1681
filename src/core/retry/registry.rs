//! Resource kind to sender dispatch table
//!
//! Built once at startup and shared read-only by the submitter and the retry
//! engine. A registry always covers every [`ResourceKind`].

use crate::adapters::satusehat::{FhirClient, ResourceEndpoint, ResourceSender};
use crate::domain::{BridgeError, ResourceKind, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Complete mapping from resource kind to sender
pub struct SenderRegistry {
    senders: HashMap<ResourceKind, Arc<dyn ResourceSender>>,
}

impl SenderRegistry {
    pub fn builder() -> SenderRegistryBuilder {
        SenderRegistryBuilder::default()
    }

    /// Registry that posts every kind through `client`
    pub fn for_client(client: Arc<FhirClient>) -> Self {
        let senders = ResourceKind::ALL
            .into_iter()
            .map(|kind| {
                let endpoint: Arc<dyn ResourceSender> =
                    Arc::new(ResourceEndpoint::new(Arc::clone(&client), kind));
                (kind, endpoint)
            })
            .collect();
        Self { senders }
    }

    /// The sender for `kind`
    pub fn sender(&self, kind: ResourceKind) -> Result<&Arc<dyn ResourceSender>> {
        self.senders
            .get(&kind)
            .ok_or_else(|| BridgeError::Configuration(format!("No sender registered for {kind}")))
    }
}

/// Collects senders; [`build`](Self::build) refuses an incomplete set
#[derive(Default)]
pub struct SenderRegistryBuilder {
    senders: HashMap<ResourceKind, Arc<dyn ResourceSender>>,
}

impl SenderRegistryBuilder {
    /// Registers `sender` for `kind`, replacing any earlier registration
    pub fn register(mut self, kind: ResourceKind, sender: Arc<dyn ResourceSender>) -> Self {
        self.senders.insert(kind, sender);
        self
    }

    /// Registers the same sender for every kind not yet registered
    pub fn register_remaining(mut self, sender: Arc<dyn ResourceSender>) -> Self {
        for kind in ResourceKind::ALL {
            self.senders
                .entry(kind)
                .or_insert_with(|| Arc::clone(&sender));
        }
        self
    }

    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] naming the kinds without a sender
    pub fn build(self) -> Result<SenderRegistry> {
        let missing: Vec<&str> = ResourceKind::ALL
            .iter()
            .filter(|kind| !self.senders.contains_key(*kind))
            .map(|kind| kind.as_str())
            .collect();

        if !missing.is_empty() {
            return Err(BridgeError::Configuration(format!(
                "No sender registered for: {}",
                missing.join(", ")
            )));
        }

        Ok(SenderRegistry {
            senders: self.senders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FhirDocument, FhirId};
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl ResourceSender for Fixed {
        async fn send(&self, _document: &FhirDocument) -> Result<FhirId> {
            FhirId::new(self.0).map_err(BridgeError::Validation)
        }
    }

    #[test]
    fn test_incomplete_registry_is_rejected() {
        let err = SenderRegistry::builder()
            .register(ResourceKind::Encounter, Arc::new(Fixed("e")))
            .build()
            .err()
            .unwrap();
        let message = err.to_string();
        assert!(message.contains("Condition"));
        assert!(message.contains("MedicationDispense"));
        assert!(!message.contains("Encounter"));
    }

    #[tokio::test]
    async fn test_specific_registration_wins_over_remaining() {
        let registry = SenderRegistry::builder()
            .register(ResourceKind::Observation, Arc::new(Fixed("obs")))
            .register_remaining(Arc::new(Fixed("other")))
            .build()
            .unwrap();

        let document = FhirDocument::new(ResourceKind::Observation, serde_json::json!({})).unwrap();
        let sent = registry
            .sender(ResourceKind::Observation)
            .unwrap()
            .send(&document)
            .await
            .unwrap();
        assert_eq!(sent.as_str(), "obs");

        let document = FhirDocument::new(ResourceKind::Procedure, serde_json::json!({})).unwrap();
        let sent = registry
            .sender(ResourceKind::Procedure)
            .unwrap()
            .send(&document)
            .await
            .unwrap();
        assert_eq!(sent.as_str(), "other");
    }
}
