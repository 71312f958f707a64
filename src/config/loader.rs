//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
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
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    tracing::info!(
        path = %path.display(),
        networks = config.networks.len(),
        "Configuration loaded"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_load_shipped_example() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/networks.example.toml");
        let config = load_config(&path).unwrap();

        let carechain = config.endpoint(0xa18e).unwrap();
        assert!(carechain.has_faucet());
        assert!(carechain.identity_manager_address.is_some());

        let mainnet = config.endpoint(1).unwrap();
        assert!(!mainnet.has_faucet());
        assert!(mainnet.registry_address.is_some());
    }

    #[test]
    fn test_load_from_tempfile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[networks]]\nnetwork_id = 255\nname = \"local\"\nrpc_url = \"http://127.0.0.1:8545\""
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.endpoint(0xff).unwrap().name, "local");
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("networks = 3"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error_message() {
        let err = parse_config(
            "[[networks]]\nnetwork_id = 1\nname = \"x\"\nrpc_url = \"nope\"",
        )
        .unwrap_err();
        assert!(err.to_string().contains("networks[0].rpc_url"));
    }
}
