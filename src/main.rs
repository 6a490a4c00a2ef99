use console_hosting::cli::commands::{CliArgs, Commands};
use console_hosting::cli::handlers::{
    handle_buildspec, handle_config, handle_outputs, handle_synth,
};
use console_hosting::util::logging::{json_from_env, parse_level, LOG_LEVEL_ENV};
use console_hosting::util::{init_logging, LoggingConfig};
use console_hosting::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("console-hosting v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Synth(synth_args) => handle_synth(synth_args),
        Commands::Buildspec(buildspec_args) => handle_buildspec(buildspec_args),
        Commands::Outputs(outputs_args) => handle_outputs(outputs_args),
        Commands::Config(config_args) => handle_config(config_args),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    init_logging(LoggingConfig {
        use_json: json_from_env(),
        ..LoggingConfig::with_level(level)
    });
}
