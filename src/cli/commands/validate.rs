//! Validate config command implementation

use crate::config::load_config;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates before returning
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Token Endpoint: {}", config.satusehat.auth_url);
        println!("  FHIR Endpoint: {}", config.satusehat.fhir_url);
        println!("  Client ID: {}", config.satusehat.client_id);
        println!(
            "  Ledger Database: {}",
            config
                .postgresql
                .connection_string
                .expose_secret()
                .as_str()
                .rsplit('@')
                .next()
                .unwrap_or("***")
        );
        println!("  Max Retries: {}", config.jobs.max_retries);
        println!("  Retry Batch Limit: {}", config.jobs.retry_batch_limit);
        println!();
        Ok(0)
    }
}
