//! Rendering typed steps into executor commands

use super::steps::{BuildStep, EnvMatch, PackageManager};

/// Turns a validated step into one command line for a build executor.
pub trait CommandRenderer {
    fn name(&self) -> &'static str;
    fn render(&self, step: &BuildStep) -> String;

    fn render_all(&self, steps: &[BuildStep]) -> Vec<String> {
        steps.iter().map(|step| self.render(step)).collect()
    }
}

/// POSIX shell commands, as run by the hosting platform's build image.
#[derive(Debug, Clone, Copy, Default)]
pub struct BashRenderer;

impl CommandRenderer for BashRenderer {
    fn name(&self) -> &'static str {
        "bash"
    }

    fn render(&self, step: &BuildStep) -> String {
        match step {
            BuildStep::FetchSecret {
                var,
                secret_id,
                json_field,
                region,
                env_file,
            } => format!(
                "echo {var}=$(aws secretsmanager get-secret-value --region {region} --secret-id {secret_id} --query SecretString --output text | jq -r .{json_field}) >> {env_file}"
            ),
            BuildStep::FetchParameter {
                var,
                name,
                region,
                env_file,
            } => format!(
                "echo {var}=$(aws ssm get-parameter --region {region} --name {name} --with-decryption --query Parameter.Value --output text) >> {env_file}"
            ),
            // No match is fine, hence `|| true`.
            BuildStep::CopyEnvMatching { pattern, env_file } => match pattern {
                EnvMatch::Exact(name) => {
                    format!("env | grep -e '^{name}=' >> {env_file} || true")
                }
                EnvMatch::Prefix(prefix) => {
                    format!("env | grep -e '^{prefix}' >> {env_file} || true")
                }
            },
            BuildStep::ChangeDirectory { path } => format!("cd {path}"),
            BuildStep::SetOption { var, value } => format!("export {var}={value}"),
            BuildStep::EnablePackageManager => "corepack enable".to_string(),
            BuildStep::ActivatePackageManager { manager, version } => {
                format!("corepack prepare {manager}@{version} --activate")
            }
            BuildStep::Install {
                manager,
                production_only,
                ignore_engines,
            } => {
                let mut command = format!("{manager} install");
                if *production_only {
                    command.push_str(match manager {
                        PackageManager::Pnpm => " --prod",
                        PackageManager::Npm => " --omit=dev",
                        PackageManager::Yarn => " --production",
                    });
                }
                if *ignore_engines {
                    command.push_str(match manager {
                        PackageManager::Pnpm => " --config.engine-strict=false",
                        PackageManager::Npm => " --engine-strict=false",
                        PackageManager::Yarn => " --ignore-engines",
                    });
                }
                command
            }
            BuildStep::RunWorkspaceBuild { manager, filter } => {
                let runner = match manager {
                    PackageManager::Pnpm => "pnpm exec",
                    PackageManager::Npm => "npx",
                    PackageManager::Yarn => "yarn",
                };
                format!("{runner} turbo run build --filter={filter}...")
            }
        }
    }
}
