//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RemoveIpConfig;
use crate::config::validation::{join_errors, validate_config, ValidationError};

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

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RemoveIpConfig, ConfigError> {
    let config: RemoveIpConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RemoveIpConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::Toggle;

    #[test]
    fn load_from_disk() {
        let path = std::env::temp_dir().join(format!("removeip-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "removeip = \"on\"\n[listener]\nbind_address = \"127.0.0.1:0\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.removeip, Toggle::On);
        assert_eq!(config.listener.bind_address, "127.0.0.1:0");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/removeip.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn bad_placeholder_fails_validation() {
        let err = parse_config("placeholder = \"0.0.0\"").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::Placeholder("0.0.0".into())]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn syntax_error_is_parse_error() {
        assert!(matches!(
            parse_config("removeip = on"),
            Err(ConfigError::Parse(_))
        ));
    }
}
