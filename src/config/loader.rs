//! Configuration loading from files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, Error, Result};

use super::TurntableConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
///
/// # Example
///
/// ```rust,ignore
/// use turntable_motion::load_config;
///
/// let config = load_config("turntable.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TurntableConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(ConfigError::IoError(format!("{}: {}", path.display(), e))))?;

    debug!(path = %path.display(), "loaded turntable configuration");
    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<TurntableConfig> {
    let config: TurntableConfig = toml::from_str(content)
        .map_err(|e| Error::Config(ConfigError::ParseError(e.message().to_string())))?;

    super::validation::validate_config(&config)?;

    Ok(config)
}
