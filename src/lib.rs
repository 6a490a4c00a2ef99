//! console-hosting - deployment composer for a server-rendered web console
//!
//! Builds the complete hosting configuration for a Next.js console living in
//! a turbo monorepo: the GitHub source binding, the execution role and its
//! credential read grants, the build pipeline, the hosting application with
//! its compute overrides, the production branch and the logging policy.
//!
//! # Example Usage
//!
//! ```no_run
//! use console_hosting::{ConsoleStack, DeployConfig, Template};
//!
//! let config = DeployConfig::from_env()?;
//! let stack = ConsoleStack::compose(&config)?;
//! println!("{}", stack.outputs().branch_url);
//! println!("{}", Template::synthesize(&stack).to_json()?);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! # Project Structure
//!
//! - [`resources`]: the individual entities and their relationships
//! - [`buildspec`]: typed build steps and their rendering
//! - [`stack`]: ordered composition of all entities
//! - [`validation`]: checks over the composed stack
//! - [`output`]: template synthesis

pub mod arn;
pub mod buildspec;
pub mod cli;
pub mod config;
pub mod error;
pub mod naming;
pub mod output;
pub mod resources;
pub mod stack;
pub mod util;
pub mod validation;

pub use config::{ConfigError, DeployConfig};
pub use error::{CompositionError, Result};
pub use output::Template;
pub use stack::{ConsoleStack, StackOutputs};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_console_hosting() {
        assert_eq!(NAME, "console-hosting");
    }
}
