//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML)
//!     → loader.rs (read & parse into a document tree)
//!     → validation.rs (structural pass, then filesystem references)
//!     → Config (validated, immutable, owned by the caller)
//!     → validation.rs lint pass (warnings only)
//!
//! While an operator edits the file:
//!     watcher.rs detects change
//!     → loader.rs loads it again
//!     → outcome (Config or ConfigError) sent to the subscriber
//! ```
//!
//! # Design Decisions
//! - No defaults: every field is required
//! - Structural and filesystem violations are separate kinds, reported together
//! - Unknown fields are rejected

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError, ConfigFormat};
pub use schema::{Config, Mount, MountType, SslConfig};
pub use validation::{lint_config, validate_config, validate_document, ValidationError, ViolationKind};
pub use watcher::ConfigWatcher;
