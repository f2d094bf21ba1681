//! PostgreSQL job ledger
//!
//! Deduplication relies on the unique index over
//! `(resource_type, idempotency_key)`; `INSERT .. ON CONFLICT DO NOTHING`
//! makes the losing writer see no returned row instead of an error.

use super::traits::JobStore;
use crate::config::schema::PostgreSQLConfig;
use crate::domain::{
    BridgeError, CreateOutcome, FhirId, IdempotencyKey, Job, JobFilter, JobId, JobStatus,
    ResourceType, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

const MIGRATION_SQL: &str = include_str!("../../../migrations/001_integration_jobs.sql");

const JOB_COLUMNS: &str = "id, resource_type, idempotency_key, payload, status, external_id, \
     error_message, retry_count, created_at, updated_at";

/// Job ledger backed by a pooled PostgreSQL connection
pub struct PostgresJobStore {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgresJobStore {
    /// Builds the connection pool
    ///
    /// No connection is opened until the first query.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] for an unparsable connection
    /// string or TLS setup failure, [`BridgeError::Database`] if the pool
    /// cannot be built.
    pub fn new(config: PostgreSQLConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .as_str()
            .parse()
            .map_err(|e| {
                BridgeError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        pg_config.ssl_mode(match config.ssl_mode.as_str() {
            "disable" => SslMode::Disable,
            "prefer" => SslMode::Prefer,
            _ => SslMode::Require,
        });
        pg_config.options(&format!(
            "-c statement_timeout={}",
            config.statement_timeout_seconds * 1000
        ));

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = if config.requires_tls() {
            let mut tls = native_tls::TlsConnector::builder();
            match config.ssl_mode.as_str() {
                "require" => {
                    tls.danger_accept_invalid_certs(true)
                        .danger_accept_invalid_hostnames(true);
                }
                "verify-ca" => {
                    tls.danger_accept_invalid_hostnames(true);
                }
                _ => {}
            }
            let connector = tls.build().map_err(|e| {
                BridgeError::Configuration(format!("Failed to build TLS connector: {e}"))
            })?;
            Manager::from_config(
                pg_config,
                postgres_native_tls::MakeTlsConnector::new(connector),
                manager_config,
            )
        } else {
            Manager::from_config(pg_config, NoTls, manager_config)
        };

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| BridgeError::Database(format!("Failed to create connection pool: {e}")))?;

        Ok(Self { pool, config })
    }

    /// Applies the ledger schema; safe to run repeatedly
    pub async fn migrate(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .batch_execute(MIGRATION_SQL)
            .await
            .map_err(|e| BridgeError::Database(format!("Failed to execute migration: {e}")))?;

        tracing::info!("Job ledger schema is up to date");
        Ok(())
    }

    /// The connection string with credentials removed, for logs
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_str())
    }

    async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        Ok(self.pool.get().await?)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        client
            .query(sql, params)
            .await
            .map_err(|e| BridgeError::Database(format!("Query failed: {e}")))
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client = self.get_connection().await?;
        client
            .execute(sql, params)
            .await
            .map_err(|e| BridgeError::Database(format!("Statement execution failed: {e}")))
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create_job(
        &self,
        resource_type: &ResourceType,
        idempotency_key: &IdempotencyKey,
        payload: &Value,
    ) -> Result<CreateOutcome> {
        let rows = self
            .query(
                "INSERT INTO mera_integration_jobs (resource_type, idempotency_key, payload, status) \
                 VALUES ($1, $2, $3, 'pending') \
                 ON CONFLICT (resource_type, idempotency_key) DO NOTHING \
                 RETURNING id",
                &[&resource_type.tag(), &idempotency_key.as_str(), payload],
            )
            .await?;

        Ok(match rows.first() {
            Some(row) => CreateOutcome::Created(JobId::new(row.try_get("id")?)),
            None => CreateOutcome::Duplicate,
        })
    }

    async fn complete_job(&self, id: JobId, external_id: &FhirId) -> Result<bool> {
        let updated = self
            .execute(
                "UPDATE mera_integration_jobs \
                 SET status = 'success', external_id = $2, error_message = '', updated_at = NOW() \
                 WHERE id = $1 AND status <> 'success'",
                &[&id.value(), &external_id.as_str()],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn fail_job(&self, id: JobId, error_message: &str) -> Result<bool> {
        let updated = self
            .execute(
                "UPDATE mera_integration_jobs \
                 SET status = 'failed', error_message = $2, retry_count = retry_count + 1, \
                     updated_at = NOW() \
                 WHERE id = $1 AND status <> 'success'",
                &[&id.value(), &error_message],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM mera_integration_jobs WHERE id = $1");
        let rows = self.query(&sql, &[&id.value()]).await?;
        rows.first().map(row_to_job).transpose()
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let status = filter.status.map(|s| s.as_str());
        let date_range: Option<(NaiveDate, NaiveDate)> = filter.date_range();
        let limit = filter.limit as i64;

        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

        if let Some(ref status) = status {
            params.push(status);
            clauses.push(format!("status = ${}", params.len()));
        }
        if let Some(ref resource_type) = filter.resource_type {
            params.push(resource_type);
            clauses.push(format!("resource_type = ${}", params.len()));
        }
        if let Some((ref from, ref to)) = date_range {
            params.push(from);
            params.push(to);
            clauses.push(format!(
                "created_at::date BETWEEN ${} AND ${}",
                params.len() - 1,
                params.len()
            ));
        }
        params.push(&limit);

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM mera_integration_jobs {where_clause} \
             ORDER BY created_at DESC, id DESC LIMIT ${}",
            params.len()
        );

        let rows = self.query(&sql, &params).await?;
        rows.iter().map(row_to_job).collect()
    }

    async fn list_failed_under_cap(&self, cap: u32, limit: usize) -> Result<Vec<Job>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM mera_integration_jobs \
             WHERE status = 'failed' AND retry_count < $1 \
             ORDER BY created_at ASC, id ASC LIMIT $2"
        );
        let cap = i32::try_from(cap).unwrap_or(i32::MAX);
        let limit = limit as i64;
        let rows = self.query(&sql, &[&cap, &limit]).await?;
        rows.iter().map(row_to_job).collect()
    }

    async fn ping(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| BridgeError::Database(format!("Connection test failed: {e}")))?;
        Ok(())
    }
}

fn row_to_job(row: &Row) -> Result<Job> {
    let id = JobId::new(row.try_get("id")?);

    let tag: String = row.try_get("resource_type")?;
    let resource_type: ResourceType = tag.parse().map_err(|e| {
        BridgeError::Validation(format!("Job {id} has an unusable resource type: {e}"))
    })?;

    let key: String = row.try_get("idempotency_key")?;
    let idempotency_key = IdempotencyKey::new(key)
        .map_err(|e| BridgeError::Validation(format!("Job {id}: {e}")))?;

    let status: String = row.try_get("status")?;
    let status: JobStatus = status
        .parse()
        .map_err(|e| BridgeError::Validation(format!("Job {id}: {e}")))?;

    let external_id: String = row.try_get("external_id")?;
    let error_message: String = row.try_get("error_message")?;
    let retry_count: i32 = row.try_get("retry_count")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Job {
        id,
        resource_type,
        idempotency_key,
        payload: row.try_get("payload")?,
        status,
        external_id: FhirId::new(external_id).ok(),
        error_message: Some(error_message).filter(|m| !m.is_empty()),
        retry_count: retry_count.max(0) as u32,
        created_at,
        updated_at,
    })
}

fn redact_connection_string(connection_string: &str) -> String {
    match connection_string.rsplit_once('@') {
        Some((_, host)) => format!("postgresql://***@{host}"),
        None => connection_string.to_string(),
    }
}
