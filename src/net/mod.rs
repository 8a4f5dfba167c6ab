//! Network-facing material.
//!
//! # Data Flow
//! ```text
//! Config.ssl (paths)
//!     → tls.rs (read PEM, check framing)
//!     → TlsMaterial (DER) handed to the serving engine's TLS stack
//! ```

pub mod tls;

pub use tls::{load_tls_material, TlsError, TlsMaterial};
