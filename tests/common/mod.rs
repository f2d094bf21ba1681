//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use mera::adapters::ledger::MemoryJobStore;
use mera::adapters::satusehat::ResourceSender;
use mera::core::{JobLedger, SenderRegistry};
use mera::domain::{
    BridgeError, FhirDocument, FhirError, FhirId, IdempotencyKey, ResourceKind, ResourceType,
    Result,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sender that counts calls and answers from a script
///
/// Once the script is used up every call succeeds with `{kind}-{n}`.
#[derive(Default)]
pub struct ScriptedSender {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Result<FhirId>>>,
    delay: Option<Duration>,
}

impl ScriptedSender {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    /// Fails `times` calls with a 503, then succeeds
    pub fn failing(times: usize) -> Arc<Self> {
        let script = (0..times).map(|_| Err(unavailable())).collect();
        Arc::new(Self {
            script: Mutex::new(script),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceSender for ScriptedSender {
    async fn send(&self, document: &FhirDocument) -> Result<FhirId> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => Ok(FhirId::new(format!("{}-{n}", document.kind())).unwrap()),
        }
    }
}

pub fn unavailable() -> BridgeError {
    FhirError::ServerError {
        status: 503,
        message: "service unavailable".to_string(),
    }
    .into()
}

pub fn memory_ledger(max_retries: u32) -> (Arc<MemoryJobStore>, Arc<JobLedger>) {
    let store = Arc::new(MemoryJobStore::new());
    let ledger = Arc::new(JobLedger::new(store.clone(), max_retries));
    (store, ledger)
}

pub fn registry(sender: Arc<ScriptedSender>) -> Arc<SenderRegistry> {
    Arc::new(
        SenderRegistry::builder()
            .register_remaining(sender)
            .build()
            .unwrap(),
    )
}

pub fn key(s: &str) -> IdempotencyKey {
    IdempotencyKey::new(s).unwrap()
}

pub fn lab() -> ResourceType {
    ResourceType::qualified(ResourceKind::Observation, "Lab").unwrap()
}

pub fn observation(code: &str) -> FhirDocument {
    FhirDocument::new(
        ResourceKind::Observation,
        json!({
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": code}]},
            "subject": {"reference": "Patient/P02478375538"}
        }),
    )
    .unwrap()
}

pub fn encounter() -> FhirDocument {
    FhirDocument::new(
        ResourceKind::Encounter,
        json!({"status": "arrived", "class": {"code": "AMB"}}),
    )
    .unwrap()
}
