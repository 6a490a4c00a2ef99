use crate::buildspec::PackageManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const ENV_PREFIX: &str = "CONSOLE_HOSTING_";

const DEFAULT_STACK_NAME: &str = "Console";
const DEFAULT_PARTITION: &str = "aws";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_BRANCH: &str = "master";
const DEFAULT_APP_ROOT: &str = "apps/studio";
const DEFAULT_PACKAGE_FILTER: &str = "studio";
const DEFAULT_TOKEN_FIELD: &str = "token";
const DEFAULT_NODE_MEMORY_MB: u32 = 4096;
const DEFAULT_PNPM_VERSION: &str = "8.6.0";
const DEFAULT_BUILD_IMAGE: &str = "public.ecr.aws/docker/library/node:18";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting '{field}'. Set {env} or pass it in the config file")]
    MissingField { field: &'static str, env: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Failed to read config file {path}: {error}")]
    ReadError { path: String, error: String },
}

/// Inputs to one console deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Root of the composition path; the app is named `<stack_name>App`.
    pub stack_name: String,
    pub partition: String,
    pub region: String,
    pub account: String,

    pub source_owner: String,
    pub source_repository: String,
    /// Secret holding the GitHub OAuth token, and the JSON field inside it.
    pub source_token_secret: String,
    pub source_token_field: String,
    pub source_branch: Option<String>,

    pub app_root: Option<String>,
    pub package_filter: String,

    pub api_url: String,
    pub db_secret_arn: String,
    pub anon_key_parameter: String,
    pub service_key_parameter: String,

    pub node_memory_mb: u32,
    pub package_manager: PackageManager,
    pub package_manager_version: String,
    pub build_image: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            partition: DEFAULT_PARTITION.to_string(),
            region: DEFAULT_REGION.to_string(),
            account: String::new(),
            source_owner: String::new(),
            source_repository: String::new(),
            source_token_secret: String::new(),
            source_token_field: DEFAULT_TOKEN_FIELD.to_string(),
            source_branch: None,
            app_root: None,
            package_filter: DEFAULT_PACKAGE_FILTER.to_string(),
            api_url: String::new(),
            db_secret_arn: String::new(),
            anon_key_parameter: String::new(),
            service_key_parameter: String::new(),
            node_memory_mb: DEFAULT_NODE_MEMORY_MB,
            package_manager: PackageManager::Pnpm,
            package_manager_version: DEFAULT_PNPM_VERSION.to_string(),
            build_image: DEFAULT_BUILD_IMAGE.to_string(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, name))
        .ok()
        .filter(|v| !v.is_empty())
}

impl DeployConfig {
    /// Defaults overlaid with `CONSOLE_HOSTING_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay_env()
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            field: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Environment variables take precedence over values already set.
    pub fn overlay_env(mut self) -> Result<Self, ConfigError> {
        let strings: [(&str, &mut String); 15] = [
            ("STACK_NAME", &mut self.stack_name),
            ("PARTITION", &mut self.partition),
            ("REGION", &mut self.region),
            ("ACCOUNT", &mut self.account),
            ("SOURCE_OWNER", &mut self.source_owner),
            ("SOURCE_REPOSITORY", &mut self.source_repository),
            ("SOURCE_TOKEN_SECRET", &mut self.source_token_secret),
            ("SOURCE_TOKEN_FIELD", &mut self.source_token_field),
            ("PACKAGE_FILTER", &mut self.package_filter),
            ("API_URL", &mut self.api_url),
            ("DB_SECRET_ARN", &mut self.db_secret_arn),
            ("ANON_KEY_PARAMETER", &mut self.anon_key_parameter),
            ("SERVICE_KEY_PARAMETER", &mut self.service_key_parameter),
            ("PACKAGE_MANAGER_VERSION", &mut self.package_manager_version),
            ("BUILD_IMAGE", &mut self.build_image),
        ];
        for (name, field) in strings {
            if let Some(value) = env_var(name) {
                *field = value;
            }
        }

        if let Some(value) = env_var("SOURCE_BRANCH") {
            self.source_branch = Some(value);
        }
        if let Some(value) = env_var("APP_ROOT") {
            self.app_root = Some(value);
        }
        if let Some(value) = env_var("NODE_MEMORY_MB") {
            self.node_memory_mb = value.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::ParseError {
                    field: format!("{}NODE_MEMORY_MB", ENV_PREFIX),
                    error: e.to_string(),
                }
            })?;
        }
        if let Some(value) = env_var("PACKAGE_MANAGER") {
            self.package_manager = parse_package_manager(&value)?;
        }

        Ok(self)
    }

    pub fn branch_name(&self) -> &str {
        self.source_branch.as_deref().unwrap_or(DEFAULT_BRANCH)
    }

    pub fn app_root(&self) -> &str {
        self.app_root.as_deref().unwrap_or(DEFAULT_APP_ROOT)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required: [(&'static str, &str); 8] = [
            ("account", &self.account),
            ("source_owner", &self.source_owner),
            ("source_repository", &self.source_repository),
            ("source_token_secret", &self.source_token_secret),
            ("api_url", &self.api_url),
            ("db_secret_arn", &self.db_secret_arn),
            ("anon_key_parameter", &self.anon_key_parameter),
            ("service_key_parameter", &self.service_key_parameter),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: name,
                    env: format!("{}{}", ENV_PREFIX, name.to_uppercase()),
                });
            }
        }

        if self.stack_name.is_empty()
            || !self.stack_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ConfigError::ValidationFailed(format!(
                "Stack name '{}' may only contain letters, digits and '-'",
                self.stack_name
            )));
        }

        if !(self.api_url.starts_with("https://") || self.api_url.starts_with("http://")) {
            return Err(ConfigError::ValidationFailed(format!(
                "API URL must be absolute http(s), got '{}'",
                self.api_url
            )));
        }

        if self.node_memory_mb < 512 {
            return Err(ConfigError::ValidationFailed(
                "Node memory ceiling must be at least 512 MB".to_string(),
            ));
        }
        if self.node_memory_mb > 65_536 {
            return Err(ConfigError::ValidationFailed(
                "Node memory ceiling cannot exceed 65536 MB".to_string(),
            ));
        }

        if let Some(branch) = &self.source_branch {
            if branch.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Source branch cannot be blank".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("stack_name".to_string(), self.stack_name.clone());
        map.insert("partition".to_string(), self.partition.clone());
        map.insert("region".to_string(), self.region.clone());
        map.insert("account".to_string(), self.account.clone());
        map.insert(
            "source".to_string(),
            format!("{}/{}", self.source_owner, self.source_repository),
        );
        map.insert("branch".to_string(), self.branch_name().to_string());
        map.insert("app_root".to_string(), self.app_root().to_string());
        map.insert("package_filter".to_string(), self.package_filter.clone());
        map.insert("api_url".to_string(), self.api_url.clone());
        map.insert("db_secret_arn".to_string(), self.db_secret_arn.clone());
        map.insert(
            "anon_key_parameter".to_string(),
            self.anon_key_parameter.clone(),
        );
        map.insert(
            "service_key_parameter".to_string(),
            self.service_key_parameter.clone(),
        );
        map.insert(
            "node_memory_mb".to_string(),
            self.node_memory_mb.to_string(),
        );
        map.insert(
            "package_manager".to_string(),
            format!("{}@{}", self.package_manager, self.package_manager_version),
        );
        map.insert("build_image".to_string(), self.build_image.clone());

        map
    }
}

fn parse_package_manager(value: &str) -> Result<PackageManager, ConfigError> {
    match value.to_lowercase().as_str() {
        "pnpm" => Ok(PackageManager::Pnpm),
        "npm" => Ok(PackageManager::Npm),
        "yarn" => Ok(PackageManager::Yarn),
        other => Err(ConfigError::ParseError {
            field: format!("{}PACKAGE_MANAGER", ENV_PREFIX),
            error: format!("unknown package manager '{}'. Valid options: pnpm, npm, yarn", other),
        }),
    }
}

impl fmt::Display for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Console Hosting Configuration:")?;
        writeln!(f, "  Stack: {}", self.stack_name)?;
        writeln!(
            f,
            "  Environment: {}/{}/{}",
            self.partition, self.region, self.account
        )?;
        writeln!(
            f,
            "  Source: {}/{} ({})",
            self.source_owner,
            self.source_repository,
            self.branch_name()
        )?;
        writeln!(f, "  App Root: {}", self.app_root())?;
        writeln!(f, "  API URL: {}", self.api_url)?;
        writeln!(f, "  DB Secret: {}", self.db_secret_arn)?;
        writeln!(f, "  Anon Key Parameter: {}", self.anon_key_parameter)?;
        writeln!(f, "  Service Key Parameter: {}", self.service_key_parameter)?;
        writeln!(
            f,
            "  Package Manager: {}@{}",
            self.package_manager, self.package_manager_version
        )?;
        writeln!(f, "  Node Memory: {} MB", self.node_memory_mb)?;
        Ok(())
    }
}
