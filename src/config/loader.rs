//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{RouterConfig, RuntimeOverrides};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Load a topology from a JSON file, apply CLI overrides, and validate.
pub fn load_config(path: &Path, overrides: &RuntimeOverrides) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, overrides)
}

/// Parse and validate a topology from a JSON string.
///
/// Overrides are applied before validation so that a threshold supplied only
/// on the command line satisfies the required-threshold check.
pub fn parse_config(json: &str, overrides: &RuntimeOverrides) -> Result<RouterConfig, ConfigError> {
    let mut config: RouterConfig = serde_json::from_str(json)?;
    config.apply_overrides(overrides);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
