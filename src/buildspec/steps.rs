//! Typed build steps
//!
//! Steps carry their inputs as data so each can be checked before anything is
//! rendered to a shell. Rendering lives in [`super::render`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("{step}: invalid environment variable name '{name}'")]
    InvalidVarName { step: &'static str, name: String },

    #[error("{step}: {field} is empty")]
    Empty { step: &'static str, field: &'static str },

    #[error("{step}: {field} '{value}' contains characters that are unsafe in a shell command")]
    UnsafeValue {
        step: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{step}: path '{path}' must be relative and stay inside the repository")]
    EscapingPath { step: &'static str, path: String },
}

fn var_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

fn safe_value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_./:@+=,-]+$").expect("static regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Pnpm,
    Npm,
    Yarn,
}

impl PackageManager {
    pub fn binary(&self) -> &'static str {
        match self {
            PackageManager::Pnpm => "pnpm",
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
        }
    }

    /// Directory dependencies are installed into, relative to the project root.
    pub fn install_dir(&self) -> &'static str {
        "node_modules"
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Which process environment variables to copy into the env file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvMatch {
    Exact(String),
    Prefix(String),
}

impl EnvMatch {
    pub fn value(&self) -> &str {
        match self {
            EnvMatch::Exact(v) | EnvMatch::Prefix(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum BuildStep {
    /// Append `var=<secret json field>` to `env_file`.
    FetchSecret {
        var: String,
        secret_id: String,
        json_field: String,
        region: String,
        env_file: String,
    },
    /// Append `var=<parameter value>` to `env_file`.
    FetchParameter {
        var: String,
        name: String,
        region: String,
        env_file: String,
    },
    CopyEnvMatching { pattern: EnvMatch, env_file: String },
    ChangeDirectory { path: String },
    SetOption { var: String, value: String },
    EnablePackageManager,
    ActivatePackageManager {
        manager: PackageManager,
        version: String,
    },
    Install {
        manager: PackageManager,
        production_only: bool,
        ignore_engines: bool,
    },
    RunWorkspaceBuild {
        manager: PackageManager,
        filter: String,
    },
}

impl BuildStep {
    pub fn kind(&self) -> &'static str {
        match self {
            BuildStep::FetchSecret { .. } => "fetch-secret",
            BuildStep::FetchParameter { .. } => "fetch-parameter",
            BuildStep::CopyEnvMatching { .. } => "copy-env",
            BuildStep::ChangeDirectory { .. } => "change-directory",
            BuildStep::SetOption { .. } => "set-option",
            BuildStep::EnablePackageManager => "enable-package-manager",
            BuildStep::ActivatePackageManager { .. } => "activate-package-manager",
            BuildStep::Install { .. } => "install",
            BuildStep::RunWorkspaceBuild { .. } => "workspace-build",
        }
    }

    pub fn validate(&self) -> Result<(), StepError> {
        let step = self.kind();
        match self {
            BuildStep::FetchSecret {
                var,
                secret_id,
                json_field,
                region,
                env_file,
            } => {
                check_var(step, var)?;
                check_value(step, "secret_id", secret_id)?;
                check_var(step, json_field).map_err(|_| StepError::UnsafeValue {
                    step,
                    field: "json_field",
                    value: json_field.clone(),
                })?;
                check_value(step, "region", region)?;
                check_relative(step, env_file)
            }
            BuildStep::FetchParameter {
                var,
                name,
                region,
                env_file,
            } => {
                check_var(step, var)?;
                check_value(step, "name", name)?;
                check_value(step, "region", region)?;
                check_relative(step, env_file)
            }
            BuildStep::CopyEnvMatching { pattern, env_file } => {
                check_var(step, pattern.value())?;
                check_relative(step, env_file)
            }
            BuildStep::ChangeDirectory { path } => {
                // Leaving the app root for the monorepo root is the point of this step.
                check_value(step, "path", path)?;
                if path.starts_with('/') {
                    return Err(StepError::EscapingPath {
                        step,
                        path: path.clone(),
                    });
                }
                Ok(())
            }
            BuildStep::SetOption { var, value } => {
                check_var(step, var)?;
                check_value(step, "value", value)
            }
            BuildStep::EnablePackageManager => Ok(()),
            BuildStep::ActivatePackageManager { version, .. } => {
                check_value(step, "version", version)
            }
            BuildStep::Install { .. } => Ok(()),
            BuildStep::RunWorkspaceBuild { filter, .. } => check_value(step, "filter", filter),
        }
    }
}

fn check_var(step: &'static str, name: &str) -> Result<(), StepError> {
    if var_name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(StepError::InvalidVarName {
            step,
            name: name.to_string(),
        })
    }
}

fn check_value(step: &'static str, field: &'static str, value: &str) -> Result<(), StepError> {
    if value.is_empty() {
        return Err(StepError::Empty { step, field });
    }
    if !safe_value_pattern().is_match(value) {
        return Err(StepError::UnsafeValue {
            step,
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Relative path that never climbs above its starting directory.
pub(crate) fn check_relative(step: &'static str, path: &str) -> Result<(), StepError> {
    check_value(step, "path", path)?;
    if path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
        return Err(StepError::EscapingPath {
            step,
            path: path.to_string(),
        });
    }
    Ok(())
}
