//! Integration tests for the PostgreSQL job ledger
//!
//! These run only when `MERA_TEST_DATABASE_URL` points at a disposable
//! database; otherwise each test returns early.

use mera::adapters::ledger::{JobStore, PostgresJobStore};
use mera::config::{secret_string, PostgreSQLConfig};
use mera::domain::{
    CreateOutcome, FhirId, IdempotencyKey, JobFilter, JobStatus, ResourceKind, ResourceType,
};
use serde_json::json;
use tokio::sync::OnceCell;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

async fn store() -> Option<PostgresJobStore> {
    let url = std::env::var("MERA_TEST_DATABASE_URL").ok()?;
    let store = PostgresJobStore::new(PostgreSQLConfig {
        connection_string: secret_string(url),
        max_connections: 4,
        connection_timeout_seconds: 10,
        statement_timeout_seconds: 30,
        ssl_mode: "disable".to_string(),
    })
    .unwrap();
    MIGRATED
        .get_or_init(|| async { store.migrate().await.unwrap() })
        .await;
    Some(store)
}

/// Key that does not collide with rows left by earlier runs
fn unique_key(label: &str) -> IdempotencyKey {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    IdempotencyKey::new(format!("{label}|{nanos}")).unwrap()
}

fn created(outcome: CreateOutcome) -> mera::domain::JobId {
    match outcome {
        CreateOutcome::Created(id) => id,
        CreateOutcome::Duplicate => panic!("expected a new job"),
    }
}

#[tokio::test]
async fn test_duplicate_insert_is_reported_not_raised() {
    let Some(store) = store().await else {
        return;
    };
    let lab = ResourceType::qualified(ResourceKind::Observation, "Lab").unwrap();
    let rad = ResourceType::qualified(ResourceKind::Observation, "Rad").unwrap();
    let key = unique_key("ORD-1");
    let payload = json!({"resourceType": "Observation", "status": "final"});

    created(store.create_job(&lab, &key, &payload).await.unwrap());
    assert_eq!(
        store.create_job(&lab, &key, &payload).await.unwrap(),
        CreateOutcome::Duplicate
    );
    created(store.create_job(&rad, &key, &payload).await.unwrap());
}

#[tokio::test]
async fn test_success_is_terminal() {
    let Some(store) = store().await else {
        return;
    };
    let encounter = ResourceType::of(ResourceKind::Encounter);
    let payload = json!({"resourceType": "Encounter", "status": "arrived"});
    let id = created(
        store
            .create_job(&encounter, &unique_key("REG-1"), &payload)
            .await
            .unwrap(),
    );

    assert!(store.fail_job(id, "Server error: 503").await.unwrap());
    let first = FhirId::new("enc-1").unwrap();
    assert!(store.complete_job(id, &first).await.unwrap());

    assert!(!store
        .complete_job(id, &FhirId::new("enc-2").unwrap())
        .await
        .unwrap());
    assert!(!store.fail_job(id, "late failure").await.unwrap());

    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(job.external_id, Some(first));
    assert_eq!(job.retry_count, 1);
}

#[tokio::test]
async fn test_list_jobs_combines_filters() {
    let Some(store) = store().await else {
        return;
    };
    let tag = format!(
        "Procedure_T{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() % 1_000_000_000
    );
    let procedure: ResourceType = tag.parse().unwrap();
    let payload = json!({"resourceType": "Procedure", "status": "completed"});

    let failed = created(
        store
            .create_job(&procedure, &unique_key("A"), &payload)
            .await
            .unwrap(),
    );
    store.fail_job(failed, "Client error: 400").await.unwrap();
    created(
        store
            .create_job(&procedure, &unique_key("B"), &payload)
            .await
            .unwrap(),
    );

    let today = chrono::Utc::now().date_naive();
    let filter = JobFilter::default()
        .with_status(JobStatus::Failed)
        .with_resource_type(tag.as_str())
        .created_between(today.pred_opt().unwrap(), today.succ_opt().unwrap())
        .with_limit(10);
    let jobs = store.list_jobs(&filter).await.unwrap();

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, failed);

    let retryable = store.list_failed_under_cap(3, 1000).await.unwrap();
    assert!(retryable.iter().any(|j| j.id == failed));
}
