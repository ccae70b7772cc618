//! TOML configuration loading for the coordinator.
//!
//! Example file:
//!
//! ```toml
//! port = 37800
//! bind_address = "0.0.0.0"
//! rendezvous_uri = "flora://10.0.0.2:2517"
//! max_sessions = 4
//! handshake_timeout_ms = 20000
//! handshake_interval_ms = 1000
//! ```
//!
//! Absent keys fall back to the `#[serde(default = "...")]` functions on
//! [`CoordinatorConfig`].  The loaded value is not validated here; the
//! binary applies command-line overrides first and the coordinator validates
//! the merged result.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::domain::CoordinatorConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// A file system I/O error other than "not found".
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parses a configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigFileError::Parse`] if the TOML is malformed or a key has
/// the wrong type.
pub fn parse_config(text: &str) -> Result<CoordinatorConfig, ConfigFileError> {
    Ok(toml::from_str(text)?)
}

/// Loads the configuration at `path`, or the defaults if the file does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigFileError::Io`] for file-system errors other than "not
/// found", and [`ConfigFileError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<CoordinatorConfig, ConfigFileError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            debug!("loading coordinator config from {}", path.display());
            parse_config(&text)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config at {}, using defaults", path.display());
            Ok(CoordinatorConfig::default())
        }
        Err(source) => Err(ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_parse_config_fills_missing_keys_with_defaults() {
        // Arrange
        let text = r#"
            rendezvous_uri = "flora://svc"
            port = 40000
        "#;

        // Act
        let cfg = parse_config(text).expect("parse partial config");

        // Assert
        assert_eq!(cfg.port, 40000);
        assert_eq!(cfg.rendezvous_uri, "flora://svc");
        assert_eq!(cfg.max_sessions, 4);
        assert_eq!(cfg.handshake_timeout_ms, 20_000);
    }

    #[test]
    fn test_parse_config_rejects_malformed_toml() {
        let result = parse_config("[[[ not valid toml");
        assert!(matches!(result, Err(ConfigFileError::Parse(_))));
    }

    #[test]
    fn test_parse_config_rejects_wrong_type() {
        let result = parse_config("port = \"not a number\"");
        assert!(matches!(result, Err(ConfigFileError::Parse(_))));
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/autonet.toml");

        let cfg = load_config(&path).expect("absent file is not an error");

        assert_eq!(cfg, CoordinatorConfig::default());
    }

    #[test]
    fn test_load_config_reads_file_from_temp_dir() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("autonet_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("autonet.toml");
        std::fs::write(
            &path,
            "rendezvous_uri = \"flora://10.0.0.2:2517\"\nhandshake_timeout_ms = 5000\n",
        )
        .unwrap();

        // Act
        let cfg = load_config(&path).expect("load from temp dir");

        // Assert
        assert_eq!(cfg.rendezvous_uri, "flora://10.0.0.2:2517");
        assert_eq!(cfg.handshake_timeout_ms, 5000);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_config_on_directory_is_io_error() {
        let dir = std::env::temp_dir();

        let result = load_config(&dir);

        assert!(matches!(result, Err(ConfigFileError::Io { .. })));
    }
}
