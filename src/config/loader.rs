//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::config::schema::Config;
use crate::config::validation::{lint_config, validate_document, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed JSON.
    #[error("parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML.
    #[error("parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A TOML file that is not UTF-8 text.
    #[error("parse error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// The document parsed but does not match the schema.
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    /// Every schema violation, or an empty slice for I/O and parse errors.
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            ConfigError::Validation(errors) => errors,
            _ => &[],
        }
    }

    /// True when the config file itself does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Syntax of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML; anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Load and validate configuration from a file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "Config file read");

    // Decoding happens in the parser so that bad encoding is a syntax error.
    let document: Value = match ConfigFormat::from_path(path) {
        ConfigFormat::Json => serde_json::from_slice(&content)?,
        ConfigFormat::Toml => toml::from_str(&String::from_utf8(content)?)?,
    };

    finish(&document)
}

/// Parse and validate configuration text.
///
/// Relative paths inside the document resolve against the working directory.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let document: Value = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };

    finish(&document)
}

fn finish(document: &Value) -> Result<Config, ConfigError> {
    let config = validate_document(document).map_err(ConfigError::Validation)?;

    for warning in lint_config(&config) {
        tracing::warn!(field = %warning.field, "{}", warning.message);
    }

    Ok(config)
}
