//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Mera using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Mera - idempotent FHIR submission bridge
#[derive(Parser, Debug)]
#[command(name = "mera")]
#[command(version, about, long_about = None)]
#[command(author = "Mera Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "mera.toml", env = "MERA_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MERA_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List or retry integration jobs
    Jobs(commands::jobs::JobsArgs),

    /// Check database and exchange connectivity
    Health(commands::health::HealthArgs),

    /// Create the job ledger table and indexes
    Migrate(commands::migrate::MigrateArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_jobs_list() {
        let cli = Cli::parse_from(["mera", "jobs", "list"]);
        assert_eq!(cli.config, "mera.toml");
        assert!(matches!(cli.command, Commands::Jobs(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["mera", "--config", "custom.toml", "health"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["mera", "--log-level", "debug", "migrate"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Migrate(_)));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["mera", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_health_json() {
        let cli = Cli::parse_from(["mera", "health", "--json"]);
        match cli.command {
            Commands::Health(args) => assert!(args.json),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["mera", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }

    #[test]
    fn test_cli_jobs_requires_subcommand() {
        assert!(Cli::try_parse_from(["mera", "jobs"]).is_err());
    }
}
