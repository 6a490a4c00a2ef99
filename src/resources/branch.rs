//! Production release branch

use crate::error::{CompositionError, Result};
use crate::naming::Scope;
use crate::resources::app::AppHandle;
use crate::resources::MONOREPO_APP_ROOT_VAR;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;

pub const DEFAULT_BRANCH: &str = "master";
pub const SITE_URL_VAR: &str = "NEXT_PUBLIC_SITE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Production,
}

/// Tells the platform which runtime adapter to provision for the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Framework {
    #[serde(rename = "Next.js - SSR")]
    NextJsSsr,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::NextJsSsr => "Next.js - SSR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BranchProps {
    pub branch_name: String,
    /// Monorepo app root, restated at branch level.
    pub app_root: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionBranch {
    #[serde(skip)]
    pub scope: Scope,
    pub app_id: String,
    pub branch_name: String,
    pub stage: Stage,
    pub enable_auto_build: bool,
    pub framework: Framework,
    pub environment_variables: BTreeMap<String, String>,
    pub url: String,
}

impl ProductionBranch {
    pub fn new(scope: Scope, app: &AppHandle, props: BranchProps) -> Result<Self> {
        if props.branch_name.trim().is_empty() {
            return Err(CompositionError::MissingInput("branch.name"));
        }

        let url = branch_url(&props.branch_name, app.default_domain());

        let environment_variables = BTreeMap::from([
            (SITE_URL_VAR.to_string(), url.clone()),
            (MONOREPO_APP_ROOT_VAR.to_string(), props.app_root),
        ]);

        info!(branch = %props.branch_name, url = %url, "Created production branch");

        Ok(Self {
            scope,
            app_id: app.app_id().to_string(),
            branch_name: props.branch_name,
            stage: Stage::Production,
            enable_auto_build: true,
            framework: Framework::NextJsSsr,
            environment_variables,
            url,
        })
    }

    pub fn properties(&self) -> Value {
        let env: Vec<Value> = self
            .environment_variables
            .iter()
            .map(|(name, value)| json!({ "Name": name, "Value": value }))
            .collect();

        json!({
            "AppId": self.app_id,
            "BranchName": self.branch_name,
            "Stage": self.stage,
            "EnableAutoBuild": self.enable_auto_build,
            "Framework": self.framework.as_str(),
            "EnvironmentVariables": env,
        })
    }
}

/// `https://<branch>.<defaultDomain>`, with `/` in the branch name mapped to `-`.
pub fn branch_url(branch_name: &str, default_domain: &str) -> String {
    format!(
        "https://{}.{}",
        branch_subdomain(branch_name),
        default_domain
    )
}

fn branch_subdomain(branch_name: &str) -> String {
    branch_name.replace('/', "-")
}
