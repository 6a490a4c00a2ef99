//! Build pipeline definition
//!
//! A [`BuildSpec`] holds typed steps for each phase. It is rendered to the
//! platform's `version: 1` document with a [`CommandRenderer`]; the default is
//! [`BashRenderer`].
//!
//! Phases run strictly in order: pre-build, build, then artifact collection.
//! A failing command aborts the remaining phases on the platform side.

pub mod render;
pub mod schema;
pub mod steps;

pub use render::{BashRenderer, CommandRenderer};
pub use schema::BuildSpecDocument;
pub use steps::{BuildStep, EnvMatch, PackageManager, StepError};

use crate::resources::refs::{ParameterRef, SecretRef};
use schema::{
    ApplicationSpec, ArtifactsSpec, CacheSpec, CommandsSpec, FrontendSpec, PhasesSpec,
    BUILD_SPEC_VERSION,
};
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_ENV_FILE: &str = ".env.production";
pub const NODE_OPTIONS_VAR: &str = "NODE_OPTIONS";
/// Server-rendered output directory picked up by the platform's compute adapter.
pub const SSR_ARTIFACT_DIR: &str = ".next";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildPhase {
    PreBuild,
    Build,
    Artifacts,
}

impl BuildPhase {
    /// Execution order; rendering walks the phases in this order.
    pub const ORDER: [BuildPhase; 3] = [BuildPhase::PreBuild, BuildPhase::Build, BuildPhase::Artifacts];
}

/// Interpreter option raising the heap ceiling, e.g. `--max-old-space-size=4096`.
pub fn node_memory_option(megabytes: u32) -> String {
    format!("--max-old-space-size={}", megabytes)
}

/// Relative path from `app_root` back to the repository root.
pub fn monorepo_root_from(app_root: &str) -> String {
    let depth = app_root
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .count();
    if depth == 0 {
        ".".to_string()
    } else {
        vec![".."; depth].join("/")
    }
}

#[derive(Debug, Clone)]
pub struct SecretFetch {
    pub var: String,
    pub secret_id: String,
    pub json_field: String,
    pub region: String,
}

impl SecretFetch {
    pub fn from_ref(var: &str, secret: &SecretRef, json_field: &str) -> Self {
        Self {
            var: var.to_string(),
            secret_id: secret.arn.to_string(),
            json_field: json_field.to_string(),
            region: secret.region().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterFetch {
    pub var: String,
    pub name: String,
    pub region: String,
}

impl ParameterFetch {
    pub fn from_ref(var: &str, parameter: &ParameterRef) -> Self {
        Self {
            var: var.to_string(),
            name: parameter.name.clone(),
            region: parameter.region().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineProps {
    pub app_root: String,
    pub package_filter: String,
    pub env_file: String,
    pub db_password: SecretFetch,
    pub anon_key: ParameterFetch,
    pub service_key: ParameterFetch,
    pub passthrough: Vec<EnvMatch>,
    pub node_memory_mb: u32,
    pub package_manager: PackageManager,
    pub package_manager_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSpec {
    pub app_root: String,
    pub pre_build: Vec<BuildStep>,
    pub build: Vec<BuildStep>,
    pub artifacts: ArtifactsSpec,
    pub cache_paths: Vec<String>,
}

impl BuildSpec {
    /// Pipeline for a server-rendered app inside a turbo monorepo.
    ///
    /// Credentials land in `env_file` inside the app root; nothing secret is
    /// ever written into the spec itself.
    pub fn for_monorepo_app(props: &PipelineProps) -> Result<Self, StepError> {
        steps::check_relative("app-root", &props.app_root)?;

        let env_file = props.env_file.clone();
        let manager = props.package_manager;

        let mut pre_build = vec![
            BuildStep::FetchSecret {
                var: props.db_password.var.clone(),
                secret_id: props.db_password.secret_id.clone(),
                json_field: props.db_password.json_field.clone(),
                region: props.db_password.region.clone(),
                env_file: env_file.clone(),
            },
            BuildStep::FetchParameter {
                var: props.anon_key.var.clone(),
                name: props.anon_key.name.clone(),
                region: props.anon_key.region.clone(),
                env_file: env_file.clone(),
            },
            BuildStep::FetchParameter {
                var: props.service_key.var.clone(),
                name: props.service_key.name.clone(),
                region: props.service_key.region.clone(),
                env_file: env_file.clone(),
            },
        ];
        pre_build.extend(props.passthrough.iter().map(|pattern| BuildStep::CopyEnvMatching {
            pattern: pattern.clone(),
            env_file: env_file.clone(),
        }));
        pre_build.extend([
            BuildStep::ChangeDirectory {
                path: monorepo_root_from(&props.app_root),
            },
            BuildStep::SetOption {
                var: NODE_OPTIONS_VAR.to_string(),
                value: node_memory_option(props.node_memory_mb),
            },
            BuildStep::EnablePackageManager,
            BuildStep::ActivatePackageManager {
                manager,
                version: props.package_manager_version.clone(),
            },
            BuildStep::Install {
                manager,
                production_only: false,
                ignore_engines: true,
            },
        ]);

        let build = vec![
            BuildStep::RunWorkspaceBuild {
                manager,
                filter: props.package_filter.clone(),
            },
            BuildStep::Install {
                manager,
                production_only: true,
                ignore_engines: true,
            },
        ];

        let spec = Self {
            app_root: props.app_root.clone(),
            pre_build,
            build,
            artifacts: ArtifactsSpec {
                base_directory: SSR_ARTIFACT_DIR.to_string(),
                files: vec!["**/*".to_string()],
            },
            cache_paths: vec![format!("{}/**/*", manager.install_dir())],
        };
        spec.validate()?;

        debug!(
            app_root = %spec.app_root,
            pre_build = spec.pre_build.len(),
            build = spec.build.len(),
            "Assembled build spec"
        );
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), StepError> {
        self.pre_build
            .iter()
            .chain(self.build.iter())
            .try_for_each(BuildStep::validate)
    }

    pub fn steps(&self, phase: BuildPhase) -> &[BuildStep] {
        match phase {
            BuildPhase::PreBuild => &self.pre_build,
            BuildPhase::Build => &self.build,
            BuildPhase::Artifacts => &[],
        }
    }

    pub fn render(&self, renderer: &dyn CommandRenderer) -> BuildSpecDocument {
        let mut frontend = FrontendSpec {
            phases: PhasesSpec::default(),
            artifacts: ArtifactsSpec::default(),
            cache: CacheSpec {
                paths: self.cache_paths.clone(),
            },
        };

        for phase in BuildPhase::ORDER {
            let commands = CommandsSpec {
                commands: renderer.render_all(self.steps(phase)),
            };
            match phase {
                BuildPhase::PreBuild => frontend.phases.pre_build = commands,
                BuildPhase::Build => frontend.phases.build = commands,
                BuildPhase::Artifacts => frontend.artifacts = self.artifacts.clone(),
            }
        }

        BuildSpecDocument {
            version: BUILD_SPEC_VERSION,
            applications: vec![ApplicationSpec {
                app_root: self.app_root.clone(),
                frontend,
            }],
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        self.render(&BashRenderer).to_yaml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> PipelineProps {
        PipelineProps {
            app_root: "apps/studio".to_string(),
            package_filter: "studio".to_string(),
            env_file: DEFAULT_ENV_FILE.to_string(),
            db_password: SecretFetch {
                var: "POSTGRES_PASSWORD".to_string(),
                secret_id: "arn:aws:secretsmanager:us-east-1:123456789012:secret:db-AbC"
                    .to_string(),
                json_field: "password".to_string(),
                region: "us-east-1".to_string(),
            },
            anon_key: ParameterFetch {
                var: "SUPABASE_ANON_KEY".to_string(),
                name: "/console/anon".to_string(),
                region: "us-east-1".to_string(),
            },
            service_key: ParameterFetch {
                var: "SUPABASE_SERVICE_KEY".to_string(),
                name: "/console/service".to_string(),
                region: "us-east-1".to_string(),
            },
            passthrough: vec![
                EnvMatch::Exact("STUDIO_PG_META_URL".to_string()),
                EnvMatch::Prefix("SUPABASE_".to_string()),
                EnvMatch::Prefix("NEXT_PUBLIC_".to_string()),
            ],
            node_memory_mb: 4096,
            package_manager: PackageManager::Pnpm,
            package_manager_version: "8.6.0".to_string(),
        }
    }

    #[test]
    fn test_monorepo_root_from() {
        assert_eq!(monorepo_root_from("apps/studio"), "../..");
        assert_eq!(monorepo_root_from("studio/"), "..");
        assert_eq!(monorepo_root_from("./apps/web/console"), "../../..");
        assert_eq!(monorepo_root_from(""), ".");
    }

    #[test]
    fn test_phase_order() {
        assert_eq!(
            BuildPhase::ORDER,
            [BuildPhase::PreBuild, BuildPhase::Build, BuildPhase::Artifacts]
        );
    }

    #[test]
    fn test_render_follows_phase_steps() {
        let spec = BuildSpec::for_monorepo_app(&props()).unwrap();
        let document = spec.render(&BashRenderer);
        let frontend = &document.applications[0].frontend;
        assert_eq!(
            frontend.phases.pre_build.commands,
            BashRenderer.render_all(spec.steps(BuildPhase::PreBuild))
        );
        assert_eq!(
            frontend.phases.build.commands,
            BashRenderer.render_all(spec.steps(BuildPhase::Build))
        );
        assert_eq!(frontend.artifacts.base_directory, SSR_ARTIFACT_DIR);
    }

    #[test]
    fn test_pre_build_step_order() {
        let spec = BuildSpec::for_monorepo_app(&props()).unwrap();
        let kinds: Vec<&str> = spec.pre_build.iter().map(BuildStep::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "fetch-secret",
                "fetch-parameter",
                "fetch-parameter",
                "copy-env",
                "copy-env",
                "copy-env",
                "change-directory",
                "set-option",
                "enable-package-manager",
                "activate-package-manager",
                "install",
            ]
        );
    }

    #[test]
    fn test_build_phase_prunes_dev_dependencies_last() {
        let spec = BuildSpec::for_monorepo_app(&props()).unwrap();
        assert_eq!(spec.steps(BuildPhase::Build).len(), 2);
        assert!(matches!(
            spec.build.last(),
            Some(BuildStep::Install {
                production_only: true,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_escaping_app_root() {
        let mut props = props();
        props.app_root = "../outside".to_string();
        assert!(matches!(
            BuildSpec::for_monorepo_app(&props),
            Err(StepError::EscapingPath { .. })
        ));
    }

    #[test]
    fn test_rejects_unsafe_parameter_name() {
        let mut props = props();
        props.anon_key.name = "/console/anon;curl evil".to_string();
        assert!(BuildSpec::for_monorepo_app(&props).is_err());
    }

    #[test]
    fn test_yaml_document_shape() {
        let spec = BuildSpec::for_monorepo_app(&props()).unwrap();
        let yaml = spec.to_yaml().unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(doc["version"], 1);
        let app = &doc["applications"][0];
        assert_eq!(app["appRoot"], "apps/studio");
        assert_eq!(app["frontend"]["artifacts"]["baseDirectory"], ".next");
        assert_eq!(app["frontend"]["artifacts"]["files"][0], "**/*");
        assert_eq!(app["frontend"]["cache"]["paths"][0], "node_modules/**/*");
        assert_eq!(
            app["frontend"]["phases"]["build"]["commands"][0],
            "pnpm exec turbo run build --filter=studio..."
        );
        assert!(yaml.find("preBuild").unwrap() < yaml.find("build:").unwrap());
    }

    #[test]
    fn test_document_parses_back() {
        let spec = BuildSpec::for_monorepo_app(&props()).unwrap();
        let yaml = spec.to_yaml().unwrap();
        let parsed = BuildSpecDocument::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, spec.render(&BashRenderer));
        assert_eq!(parsed.commands().count(), 13);
    }

    struct EchoRenderer;

    impl CommandRenderer for EchoRenderer {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn render(&self, step: &BuildStep) -> String {
            format!("echo {}", step.kind())
        }
    }

    #[test]
    fn test_renderer_is_swappable() {
        let spec = BuildSpec::for_monorepo_app(&props()).unwrap();
        let doc = spec.render(&EchoRenderer);
        let phases = &doc.applications[0].frontend.phases;
        assert_eq!(phases.pre_build.commands[0], "echo fetch-secret");
        assert_eq!(phases.build.commands[1], "echo install");
    }
}
