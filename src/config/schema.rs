//! Configuration schema definitions.
//!
//! These are the typed records handed to the serving engine. The loader
//! builds them with [`crate::config::validation::validate_document`] so that
//! every violation in a document is reported at once. Deserializing straight
//! into them rejects unknown fields but checks nothing else; follow it with
//! [`crate::config::validation::validate_config`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for the file server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// TLS material used by the listener.
    pub ssl: SslConfig,

    /// Content mounts, in declaration order.
    pub mounts: Vec<Mount>,

    /// Origins allowed to make cross-origin requests.
    pub origins: Vec<String>,
}

/// TLS material paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SslConfig {
    /// Private key (PEM).
    pub key: PathBuf,

    /// Certificate chain (PEM).
    pub certificate: PathBuf,

    /// Root CA bundle (PEM).
    pub root: PathBuf,
}

/// A named binding of a URL prefix to a local directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Mount {
    /// Mount identifier for logging.
    pub name: String,

    /// How the directory is served.
    #[serde(rename = "type")]
    pub mount_type: MountType,

    /// URL mount point (e.g., "/docs").
    pub path: String,

    /// Directory backing the mount.
    pub directory: PathBuf,
}

/// Serving mode of a mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MountType {
    /// Single-page application: unmatched routes fall back to the index document.
    #[serde(rename = "SPA")]
    Spa,
    /// File transfer over FTP.
    #[serde(rename = "FTP")]
    Ftp,
    /// Plain static pages.
    #[serde(rename = "PAGE")]
    Page,
}

impl MountType {
    pub const ALL: [MountType; 3] = [MountType::Spa, MountType::Ftp, MountType::Page];

    /// The tag used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            MountType::Spa => "SPA",
            MountType::Ftp => "FTP",
            MountType::Page => "PAGE",
        }
    }
}

impl fmt::Display for MountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the mount type tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mount type `{0}` (expected one of SPA, FTP, PAGE)")]
pub struct UnknownMountType(pub String);

impl FromStr for MountType {
    type Err = UnknownMountType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MountType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownMountType(s.to_string()))
    }
}
