//! Migrate command implementation

use crate::adapters::ledger::create_postgres_store;
use crate::config::load_config;
use clap::Args;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {}

impl MigrateArgs {
    /// Creates the job ledger table and indexes if missing
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let store = match create_postgres_store(&config) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to set up database pool");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        match store.migrate().await {
            Ok(()) => {
                println!("✅ Job ledger schema applied on {}", store.connection_string_safe());
                Ok(0)
            }
            Err(e) => {
                println!("❌ Migration failed");
                println!("   Error: {e}");
                Ok(4)
            }
        }
    }
}
