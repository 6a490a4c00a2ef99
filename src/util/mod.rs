//! Utility modules
//!
//! Currently only structured logging setup.

pub mod logging;

pub use logging::{init_from_env, init_logging, LoggingConfig};
