//! Observability subsystem.
//!
//! Only logging lives here: the loader and the CLI emit `tracing` events,
//! and the binary installs the subscriber at startup.

pub mod logging;

pub use logging::init_logging;
