use crate::buildspec::PackageManager;
use crate::config::{ConfigError, DeployConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Deployment configuration composer for the server-rendered web console
#[derive(Parser, Debug)]
#[command(
    name = "console-hosting",
    about = "Compose the hosting deployment for the server-rendered web console",
    version,
    author,
    long_about = "console-hosting composes the source binding, execution role, build \
                  pipeline, hosting application, production branch and logging policy \
                  for the web console, and synthesizes them into a deployment template. \
                  Inputs come from a YAML config file, CONSOLE_HOSTING_* environment \
                  variables and command-line flags, in increasing precedence."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Verbose output (debug level)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Synthesize the deployment template",
        long_about = "Composes every resource and writes the deployment template.\n\n\
                      Examples:\n  \
                      console-hosting synth --config deploy.yaml\n  \
                      console-hosting synth --config deploy.yaml --format yaml -o template.yaml"
    )]
    Synth(SynthArgs),

    #[command(
        about = "Print the rendered build spec",
        long_about = "Composes the stack and prints the build spec document the hosting \
                      platform will run.\n\n\
                      Examples:\n  \
                      console-hosting buildspec --config deploy.yaml\n  \
                      console-hosting buildspec --app-root apps/www --format json"
    )]
    Buildspec(BuildspecArgs),

    #[command(
        about = "Print the stack outputs",
        long_about = "Composes the stack and prints the application id, default domain \
                      and production branch URL.\n\n\
                      Examples:\n  \
                      console-hosting outputs --config deploy.yaml\n  \
                      console-hosting outputs --config deploy.yaml --format json"
    )]
    Outputs(OutputsArgs),

    #[command(
        about = "Show the resolved configuration",
        long_about = "Merges the config file, environment and flags and prints the result \
                      without composing anything."
    )]
    Config(ConfigArgs),
}

/// Deployment inputs shared by every subcommand. Flags override the file and environment.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    #[arg(short = 'c', long, value_name = "FILE", help = "YAML deployment config")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "NAME", help = "Root name of the composition")]
    pub stack_name: Option<String>,

    #[arg(long, value_name = "ID", help = "12-digit account id")]
    pub account: Option<String>,

    #[arg(long, value_name = "REGION", help = "Deployment region")]
    pub region: Option<String>,

    #[arg(long, value_name = "PARTITION", help = "ARN partition (default: aws)")]
    pub partition: Option<String>,

    #[arg(long, value_name = "OWNER", help = "GitHub owner of the console repository")]
    pub owner: Option<String>,

    #[arg(long, value_name = "REPO", help = "GitHub repository name")]
    pub repository: Option<String>,

    #[arg(
        long,
        value_name = "SECRET",
        help = "Secret holding the GitHub OAuth token"
    )]
    pub token_secret: Option<String>,

    #[arg(
        long,
        value_name = "FIELD",
        help = "JSON field of the token secret (default: token)"
    )]
    pub token_field: Option<String>,

    #[arg(long, value_name = "BRANCH", help = "Production branch (default: master)")]
    pub branch: Option<String>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Monorepo app root (default: apps/studio)"
    )]
    pub app_root: Option<String>,

    #[arg(
        long,
        value_name = "PACKAGE",
        help = "Workspace package the build is filtered to (default: studio)"
    )]
    pub package_filter: Option<String>,

    #[arg(long, value_name = "URL", help = "Backend API URL exposed to the console")]
    pub api_url: Option<String>,

    #[arg(long, value_name = "ARN", help = "Database credentials secret ARN")]
    pub db_secret_arn: Option<String>,

    #[arg(long, value_name = "NAME", help = "Parameter holding the anonymous key")]
    pub anon_key_parameter: Option<String>,

    #[arg(long, value_name = "NAME", help = "Parameter holding the service key")]
    pub service_key_parameter: Option<String>,

    #[arg(long, value_name = "MB", help = "Build-time Node heap ceiling")]
    pub node_memory_mb: Option<u32>,

    #[arg(long, value_enum, help = "Package manager (default: pnpm)")]
    pub package_manager: Option<PackageManagerArg>,

    #[arg(long, value_name = "VERSION", help = "Package manager version to activate")]
    pub package_manager_version: Option<String>,

    #[arg(long, value_name = "IMAGE", help = "Custom build image")]
    pub build_image: Option<String>,
}

impl InputArgs {
    /// Defaults, then the config file, then the environment, then flags.
    pub fn resolve(&self) -> Result<DeployConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => DeployConfig::from_yaml_file(path)?,
            None => DeployConfig::default(),
        };
        let mut config = base.overlay_env()?;

        let strings = [
            (&self.stack_name, &mut config.stack_name),
            (&self.account, &mut config.account),
            (&self.region, &mut config.region),
            (&self.partition, &mut config.partition),
            (&self.owner, &mut config.source_owner),
            (&self.repository, &mut config.source_repository),
            (&self.token_secret, &mut config.source_token_secret),
            (&self.token_field, &mut config.source_token_field),
            (&self.package_filter, &mut config.package_filter),
            (&self.api_url, &mut config.api_url),
            (&self.db_secret_arn, &mut config.db_secret_arn),
            (&self.anon_key_parameter, &mut config.anon_key_parameter),
            (&self.service_key_parameter, &mut config.service_key_parameter),
            (&self.package_manager_version, &mut config.package_manager_version),
            (&self.build_image, &mut config.build_image),
        ];
        for (flag, field) in strings {
            if let Some(value) = flag {
                *field = value.clone();
            }
        }

        if self.branch.is_some() {
            config.source_branch = self.branch.clone();
        }
        if self.app_root.is_some() {
            config.app_root = self.app_root.clone();
        }
        if let Some(mb) = self.node_memory_mb {
            config.node_memory_mb = mb;
        }
        if let Some(manager) = self.package_manager {
            config.package_manager = manager.into();
        }

        Ok(config)
    }
}

#[derive(Parser, Debug, Clone)]
pub struct SynthArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "json",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildspecArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "yaml",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct OutputsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManagerArg {
    Pnpm,
    Npm,
    Yarn,
}

impl From<PackageManagerArg> for PackageManager {
    fn from(arg: PackageManagerArg) -> Self {
        match arg {
            PackageManagerArg::Pnpm => PackageManager::Pnpm,
            PackageManagerArg::Npm => PackageManager::Npm,
            PackageManagerArg::Yarn => PackageManager::Yarn,
        }
    }
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_synth_args() {
        let args = CliArgs::parse_from(["console-hosting", "synth"]);
        match args.command {
            Commands::Synth(synth) => {
                assert_eq!(synth.format, OutputFormatArg::Json);
                assert!(synth.output.is_none());
                assert!(synth.input.config.is_none());
            }
            _ => panic!("Expected Synth command"),
        }
    }

    #[test]
    fn test_buildspec_defaults_to_yaml() {
        let args = CliArgs::parse_from(["console-hosting", "buildspec"]);
        match args.command {
            Commands::Buildspec(buildspec) => assert_eq!(buildspec.format, OutputFormatArg::Yaml),
            _ => panic!("Expected Buildspec command"),
        }
    }

    #[test]
    fn test_input_flags() {
        let args = CliArgs::parse_from([
            "console-hosting",
            "outputs",
            "--branch",
            "release/v2",
            "--app-root",
            "apps/www",
            "--node-memory-mb",
            "8192",
        ]);
        match args.command {
            Commands::Outputs(outputs) => {
                assert_eq!(outputs.input.branch.as_deref(), Some("release/v2"));
                assert_eq!(outputs.input.app_root.as_deref(), Some("apps/www"));
                assert_eq!(outputs.input.node_memory_mb, Some(8192));
                assert_eq!(outputs.format, OutputFormatArg::Human);
            }
            _ => panic!("Expected Outputs command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["console-hosting", "synth", "--log-level", "debug", "-v"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.verbose);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(CliArgs::try_parse_from(["console-hosting", "synth", "-q", "-v"]).is_err());
    }

    #[test]
    #[serial]
    fn test_flags_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "account: \"123456789012\"\nsource_owner: acme\napp_root: apps/studio").unwrap();

        let input = InputArgs {
            config: Some(file.path().to_path_buf()),
            owner: Some("other".to_string()),
            app_root: Some("apps/www".to_string()),
            ..Default::default()
        };
        let config = input.resolve().unwrap();
        assert_eq!(config.account, "123456789012");
        assert_eq!(config.source_owner, "other");
        assert_eq!(config.app_root(), "apps/www");
    }

    #[test]
    #[serial]
    fn test_build_flags_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "package_manager: pnpm\npackage_filter: studio").unwrap();

        let args = CliArgs::parse_from([
            "console-hosting",
            "config",
            "--config",
            file.path().to_str().unwrap(),
            "--partition",
            "aws-us-gov",
            "--token-field",
            "oauth",
            "--package-filter",
            "www",
            "--package-manager",
            "yarn",
            "--package-manager-version",
            "1.22.19",
            "--build-image",
            "node:20",
        ]);
        let config = match args.command {
            Commands::Config(config) => config.input.resolve().unwrap(),
            _ => panic!("Expected Config command"),
        };
        assert_eq!(config.partition, "aws-us-gov");
        assert_eq!(config.source_token_field, "oauth");
        assert_eq!(config.package_filter, "www");
        assert_eq!(config.package_manager, PackageManager::Yarn);
        assert_eq!(config.package_manager_version, "1.22.19");
        assert_eq!(config.build_image, "node:20");
    }

    #[test]
    fn test_unknown_package_manager_rejected() {
        assert!(
            CliArgs::try_parse_from(["console-hosting", "synth", "--package-manager", "bun"]).is_err()
        );
    }
}
