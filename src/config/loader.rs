//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let file = format!("granblue-proxy-{}-{}.toml", name, std::process::id());
        let path = std::env::temp_dir().join(file);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_valid_file() {
        let path = write_temp(
            "valid",
            r#"
            [controller]
            bind_address = "127.0.0.1:8088"
            web_address = "127.0.0.1:8000"
            web_host = "gbf.local"
            "#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.controller.resolved_web_host().as_deref(), Some("gbf.local"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_invalid_values() {
        let path = write_temp(
            "invalid",
            r#"
            [tunnel]
            bind_address = "not an address"
            "#,
        );
        match load_config(&path) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_config(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
