//! Configuration schema and loader for a multi-mount file server.

pub mod config;
pub mod net;
pub mod observability;

pub use config::{load_config, Config, ConfigError, Mount, MountType, SslConfig};
