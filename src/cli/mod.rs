pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{
    BuildspecArgs, CliArgs, Commands, ConfigArgs, InputArgs, OutputsArgs, SynthArgs,
};
pub use output::{OutputFormat, OutputFormatter};
