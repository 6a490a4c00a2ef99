//! Output formatting for multiple formats
//!
//! Every document the CLI prints goes through [`OutputFormatter`], which
//! renders JSON, YAML or human-readable text.
//!
//! ```ignore
//! use console_hosting::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_outputs(&stack.outputs())?);
//! ```

use anyhow::{Context, Result};

use crate::buildspec::BuildSpecDocument;
use crate::config::DeployConfig;
use crate::output::Template;
use crate::stack::StackOutputs;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Templates have no human rendering; `Human` falls back to YAML.
    pub fn format_template(&self, template: &Template) -> Result<String> {
        match self.format {
            OutputFormat::Json => template.to_json(),
            OutputFormat::Yaml | OutputFormat::Human => template.to_yaml(),
        }
    }

    pub fn format_buildspec(&self, document: &BuildSpecDocument) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(document)
                .context("Failed to serialize build spec to JSON"),
            OutputFormat::Yaml => document
                .to_yaml()
                .context("Failed to serialize build spec to YAML"),
            OutputFormat::Human => Ok(self.format_buildspec_human(document)),
        }
    }

    pub fn format_outputs(&self, outputs: &StackOutputs) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outputs)
                .context("Failed to serialize stack outputs to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(outputs).context("Failed to serialize stack outputs to YAML")
            }
            OutputFormat::Human => Ok(self.format_outputs_human(outputs)),
        }
    }

    /// Formats configuration display
    pub fn format_config(&self, config: &DeployConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let config_map = config.to_display_map();
                serde_json::to_string_pretty(&config_map)
                    .context("Failed to serialize config to JSON")
            }
            OutputFormat::Yaml => {
                let config_map = config.to_display_map();
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn format_buildspec_human(&self, document: &BuildSpecDocument) -> String {
        let mut output = String::new();
        for app in &document.applications {
            output.push_str(&format!("App root: {}\n", app.app_root));

            output.push_str("\nPre-build:\n");
            for (i, command) in app.frontend.phases.pre_build.commands.iter().enumerate() {
                output.push_str(&format!("  {:>2}. {}\n", i + 1, command));
            }

            output.push_str("\nBuild:\n");
            for (i, command) in app.frontend.phases.build.commands.iter().enumerate() {
                output.push_str(&format!("  {:>2}. {}\n", i + 1, command));
            }

            output.push_str(&format!(
                "\nArtifacts: {} ({})\n",
                app.frontend.artifacts.base_directory,
                app.frontend.artifacts.files.join(", ")
            ));
            output.push_str(&format!("Cache: {}\n", app.frontend.cache.paths.join(", ")));
        }
        output
    }

    fn format_outputs_human(&self, outputs: &StackOutputs) -> String {
        let mut output = String::new();
        output.push_str(&format!("Application:    {}\n", outputs.app_name));
        output.push_str(&format!("App ID:         {}\n", outputs.app_id));
        output.push_str(&format!("Default domain: {}\n", outputs.default_domain));
        output.push_str(&format!("Branch:         {}\n", outputs.branch_name));
        output.push_str(&format!("Branch URL:     {}\n", outputs.branch_url));
        output.push_str(&format!("Service role:   {}\n", outputs.role_arn));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::ConsoleStack;

    fn stack() -> ConsoleStack {
        let config = DeployConfig {
            account: "123456789012".to_string(),
            source_owner: "acme".to_string(),
            source_repository: "app".to_string(),
            source_token_secret: "github-token".to_string(),
            api_url: "https://api.example.com".to_string(),
            db_secret_arn: "arn:aws:secretsmanager:us-east-1:123456789012:secret:db-AbC"
                .to_string(),
            anon_key_parameter: "/console/anon".to_string(),
            service_key_parameter: "/console/service".to_string(),
            ..Default::default()
        };
        ConsoleStack::compose(&config).unwrap()
    }

    #[test]
    fn test_outputs_json() {
        let stack = stack();
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format_outputs(&stack.outputs()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["app_id"], stack.app.app_id());
        assert_eq!(parsed["branch_name"], "master");
    }

    #[test]
    fn test_outputs_human() {
        let stack = stack();
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_outputs(&stack.outputs()).unwrap();
        assert!(output.contains("Branch URL:"));
        assert!(output.contains(&stack.branch.url));
    }

    #[test]
    fn test_buildspec_yaml_round_trips() {
        let stack = stack();
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let output = formatter.format_buildspec(stack.app.build_spec()).unwrap();
        assert!(output.contains("appRoot: apps/studio"));
        assert_eq!(&BuildSpecDocument::from_yaml(&output).unwrap(), stack.app.build_spec());
    }

    #[test]
    fn test_buildspec_human_numbers_commands() {
        let stack = stack();
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_buildspec(stack.app.build_spec()).unwrap();
        assert!(output.contains("Pre-build:"));
        assert!(output.contains(" 1. "));
        assert!(output.contains("Artifacts: .next"));
    }

    #[test]
    fn test_config_human() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_config(&DeployConfig::default()).unwrap();
        assert!(output.contains("Console Hosting Configuration:"));
    }

    #[test]
    fn test_template_human_falls_back_to_yaml() {
        let template = Template::synthesize(&stack());
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_template(&template)
            .unwrap();
        assert!(output.contains("AWSTemplateFormatVersion"));
    }
}
