//! Configuration file loading and validation.

use std::path::Path;

use crate::error::ConfigError;
use crate::types::KilnConfig;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Loads and validates a `kiln.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<KilnConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.scan.threads == Some(0) {
        return Err(ConfigError::ValidationError(
            "scan.threads must be at least 1".to_string(),
        ));
    }
    let automoc = &config.automoc;
    for (field, value) in [
        ("automoc.header_prefix", &automoc.header_prefix),
        ("automoc.header_extension", &automoc.header_extension),
        ("automoc.source_extension", &automoc.source_extension),
        ("automoc.object_extension", &automoc.object_extension),
    ] {
        if value.is_empty() {
            return Err(ConfigError::ValidationError(format!("{field} must not be empty")));
        }
    }
    Ok(())
}
