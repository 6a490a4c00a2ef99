//! Subcommand handlers. Each returns the process exit code.

use crate::cli::commands::{BuildspecArgs, ConfigArgs, InputArgs, OutputsArgs, SynthArgs};
use crate::cli::output::{OutputFormat, OutputFormatter};
use crate::output::Template;
use crate::stack::ConsoleStack;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

fn compose(input: &InputArgs) -> Result<ConsoleStack> {
    let config = input.resolve().context("Failed to resolve deployment inputs")?;
    debug!(stack = %config.stack_name, "Resolved configuration");
    ConsoleStack::compose(&config).context("Composition aborted")
}

fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!(path = %path.display(), "Wrote output");
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn report(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

pub fn handle_synth(args: &SynthArgs) -> i32 {
    report(run_synth(args))
}

pub fn handle_buildspec(args: &BuildspecArgs) -> i32 {
    report(run_buildspec(args))
}

pub fn handle_outputs(args: &OutputsArgs) -> i32 {
    report(run_outputs(args))
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    report(run_config(args))
}

fn run_synth(args: &SynthArgs) -> Result<()> {
    let stack = compose(&args.input)?;
    let template = Template::synthesize(&stack);
    info!(resources = template.resources.len(), "Synthesized template");
    let content = OutputFormatter::new(args.format.into()).format_template(&template)?;
    emit(&content, args.output.as_deref())
}

fn run_buildspec(args: &BuildspecArgs) -> Result<()> {
    let stack = compose(&args.input)?;
    let content =
        OutputFormatter::new(args.format.into()).format_buildspec(stack.app.build_spec())?;
    emit(&content, args.output.as_deref())
}

fn run_outputs(args: &OutputsArgs) -> Result<()> {
    let stack = compose(&args.input)?;
    let content = OutputFormatter::new(args.format.into()).format_outputs(&stack.outputs())?;
    emit(&content, None)
}

fn run_config(args: &ConfigArgs) -> Result<()> {
    let config = args
        .input
        .resolve()
        .context("Failed to resolve deployment inputs")?;
    let format: OutputFormat = args.format.into();
    let content = OutputFormatter::new(format).format_config(&config)?;
    emit(&content, None)
}
