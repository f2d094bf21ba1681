//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{Environment, MeraConfig};
use super::secret::secret_string;
use crate::domain::errors::BridgeError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Substitutes `${VAR}` placeholders from the environment
/// 3. Parses the TOML into [`MeraConfig`]
/// 4. Applies `MERA_*` environment overrides
/// 5. Validates the result
///
/// # Errors
///
/// Returns [`BridgeError::Configuration`] if the file is missing or
/// unreadable, a referenced variable is unset, parsing fails, or validation
/// fails.
///
/// # Examples
///
/// ```no_run
/// use mera::config::loader::load_config;
///
/// let config = load_config("mera.toml").expect("Failed to load config");
/// println!("{}", config.satusehat.fhir_url);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<MeraConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(BridgeError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BridgeError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: MeraConfig = toml::from_str(&contents)
        .map_err(|e| BridgeError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        BridgeError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched so that documented placeholders in a
/// sample file don't have to be set.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| BridgeError::Other(format!("Invalid placeholder pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(BridgeError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the `MERA_*` prefix
///
/// Variables follow the pattern `MERA_<SECTION>_<KEY>`, for example
/// `MERA_SATUSEHAT_CLIENT_SECRET` or `MERA_JOBS_MAX_RETRIES`. Values that fail
/// to parse are rejected rather than silently ignored.
fn apply_env_overrides(config: &mut MeraConfig) -> Result<()> {
    if let Ok(val) = std::env::var("MERA_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("MERA_ENVIRONMENT") {
        config.environment = match val.to_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(BridgeError::Configuration(format!(
                    "MERA_ENVIRONMENT must be development, staging or production, got '{other}'"
                )))
            }
        };
    }

    // SATUSEHAT overrides
    if let Ok(val) = std::env::var("MERA_SATUSEHAT_AUTH_URL") {
        config.satusehat.auth_url = val;
    }
    if let Ok(val) = std::env::var("MERA_SATUSEHAT_FHIR_URL") {
        config.satusehat.fhir_url = val;
    }
    if let Ok(val) = std::env::var("MERA_SATUSEHAT_CLIENT_ID") {
        config.satusehat.client_id = val;
    }
    if let Ok(val) = std::env::var("MERA_SATUSEHAT_CLIENT_SECRET") {
        config.satusehat.client_secret = secret_string(val);
    }
    if let Some(val) = parsed_env("MERA_SATUSEHAT_TIMEOUT_SECONDS")? {
        config.satusehat.timeout_seconds = val;
    }
    if let Some(val) = parsed_env("MERA_SATUSEHAT_TOKEN_SAFETY_MARGIN_SECONDS")? {
        config.satusehat.token_safety_margin_seconds = val;
    }
    if let Some(val) = parsed_env("MERA_SATUSEHAT_TLS_VERIFY")? {
        config.satusehat.tls_verify = val;
    }

    // PostgreSQL overrides
    if let Ok(val) = std::env::var("MERA_POSTGRESQL_CONNECTION_STRING") {
        config.postgresql.connection_string = secret_string(val);
    }
    if let Some(val) = parsed_env("MERA_POSTGRESQL_MAX_CONNECTIONS")? {
        config.postgresql.max_connections = val;
    }
    if let Ok(val) = std::env::var("MERA_POSTGRESQL_SSL_MODE") {
        config.postgresql.ssl_mode = val;
    }

    // Job overrides
    if let Some(val) = parsed_env("MERA_JOBS_MAX_RETRIES")? {
        config.jobs.max_retries = val;
    }
    if let Some(val) = parsed_env("MERA_JOBS_RETRY_BATCH_LIMIT")? {
        config.jobs.retry_batch_limit = val;
    }

    // Logging overrides
    if let Some(val) = parsed_env("MERA_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Ok(val) = std::env::var("MERA_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

fn parsed_env<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(val) => val.trim().parse::<T>().map(Some).map_err(|e| {
            BridgeError::Configuration(format!("Invalid value for {name} ('{val}'): {e}"))
        }),
        Err(_) => Ok(None),
    }
}
