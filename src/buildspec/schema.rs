//! Serialized build spec document consumed by the hosting platform

use serde::{Deserialize, Serialize};

pub const BUILD_SPEC_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpecDocument {
    pub version: u32,
    pub applications: Vec<ApplicationSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    pub app_root: String,
    pub frontend: FrontendSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendSpec {
    pub phases: PhasesSpec,
    pub artifacts: ArtifactsSpec,
    pub cache: CacheSpec,
}

/// Field order is execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhasesSpec {
    pub pre_build: CommandsSpec,
    pub build: CommandsSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandsSpec {
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactsSpec {
    pub base_directory: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSpec {
    pub paths: Vec<String>,
}

impl BuildSpecDocument {
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// All commands, pre-build first.
    pub fn commands(&self) -> impl Iterator<Item = &String> {
        self.applications.iter().flat_map(|app| {
            app.frontend
                .phases
                .pre_build
                .commands
                .iter()
                .chain(app.frontend.phases.build.commands.iter())
        })
    }
}
