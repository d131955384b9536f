//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "loom.toml";

/// Loads and validates a `loom.toml` configuration from a project directory.
///
/// Reads `<project_dir>/loom.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_from_path(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_from_path(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `loom.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.sources.extensions.is_empty() {
        return Err(ConfigError::ValidationError(
            "sources.extensions must list at least one extension".to_string(),
        ));
    }
    if let Some(ext) = config
        .sources
        .extensions
        .iter()
        .find(|ext| ext.trim_start_matches('.').is_empty())
    {
        return Err(ConfigError::ValidationError(format!(
            "invalid source extension '{ext}'"
        )));
    }
    if config.events.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "events.capacity must be positive".to_string(),
        ));
    }
    if config
        .compiler
        .command
        .as_deref()
        .is_some_and(|command| command.trim().is_empty())
    {
        return Err(ConfigError::MissingField("compiler.command".to_string()));
    }
    Ok(())
}
