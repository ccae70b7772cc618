//! TOML configuration loading for the broadcaster.
//!
//! ```toml
//! port = 37800
//! broadcast_interval_ms = 10000
//! device_id = "12345678"
//! device_name = "foo"
//! device_type = 0
//! broadcast_addr = "255.255.255.255"
//! max_attempts = 30
//! ```
//!
//! A missing file yields [`BroadcasterConfig::default`].  Validation happens
//! later, when the broadcaster is built from the merged configuration.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::domain::BroadcasterConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads the configuration at `path`, or the defaults if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigFileError::Io`] for file-system errors other than "not
/// found", and [`ConfigFileError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<BroadcasterConfig, ConfigFileError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config at {}, using defaults", path.display());
            return Ok(BroadcasterConfig::default());
        }
        Err(source) => {
            return Err(ConfigFileError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    Ok(toml::from_str(&text)?)
}
