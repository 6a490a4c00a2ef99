use thiserror::Error;

use crate::arn::ArnError;
use crate::buildspec::steps::StepError;
use crate::config::ConfigError;

/// Errors raised while assembling the deployment configuration.
///
/// Every variant aborts the whole composition; no partial stack is returned.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("Missing required input: {0}")]
    MissingInput(&'static str),

    #[error("Invalid input {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error(transparent)]
    MalformedArn(#[from] ArnError),

    #[error("Invalid build step: {0}")]
    InvalidStep(#[from] StepError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to attach policy '{policy}' to role '{role}': {reason}")]
    PolicyAttachment {
        policy: String,
        role: String,
        reason: String,
    },

    #[error("Failed to serialize {what}: {reason}")]
    Serialization { what: &'static str, reason: String },

    #[error("Unknown override path '{0}'")]
    UnknownOverride(String),

    #[error("[{rule}] {message}")]
    Validation { rule: &'static str, message: String },
}

pub type Result<T, E = CompositionError> = std::result::Result<T, E>;
