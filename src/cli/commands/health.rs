//! Health command implementation
//!
//! Checks the two things every submission depends on: the ledger database
//! answers, and the exchange hands out a token.

use super::{build_client, build_ledger};
use crate::config::load_config;
use clap::Args;
use serde::Serialize;

/// Arguments for the health command
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    database: CheckResult,
    token: CheckResult,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CheckResult {
    fn from_result<T, E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => Self {
                ok: true,
                error: None,
            },
            Err(e) => Self {
                ok: false,
                error: Some(e.to_string()),
            },
        }
    }
}

impl HealthArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let database_check = async {
            match build_ledger(&config) {
                Ok(ledger) => CheckResult::from_result(ledger.ping().await),
                Err(e) => CheckResult::from_result::<(), _>(Err(e)),
            }
        };
        let token_check = async {
            match build_client(&config) {
                Ok(client) => CheckResult::from_result(client.tokens().get_token().await),
                Err(e) => CheckResult::from_result::<(), _>(Err(e)),
            }
        };
        let (database, token) = futures::join!(database_check, token_check);

        let healthy = database.ok && token.ok;
        let report = HealthReport {
            status: if healthy { "ok" } else { "degraded" },
            database,
            token,
        };

        tracing::info!(
            database_ok = report.database.ok,
            token_ok = report.token.ok,
            "Health check completed"
        );

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_check("Job ledger database", &report.database);
            print_check("SATUSEHAT token", &report.token);
        }

        Ok(if healthy { 0 } else { 4 })
    }
}

fn print_check(name: &str, check: &CheckResult) {
    match &check.error {
        None => println!("✅ {name}: ok"),
        Some(e) => {
            println!("❌ {name}: failed");
            println!("   Error: {e}");
        }
    }
}
