//! oomadjust - version 0.1.0
//!
//! Keeps OOM killer adjustments at their declared values, with tracing logging.
//! This is the main entry point that loads the manifest and dispatches subcommands.

mod cli;
mod commands;
mod config;
mod startup_checks;

use clap::Parser;
use tracing::{debug, info, level_filters::LevelFilter};

use cli::{Args, Commands, LogLevel};
use commands::{command_apply, command_check, command_config, command_show};
use config::{
    apply_resource_args, resolve_config, show_config, validate_effective_config,
    validate_settings, Config,
};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) {
    let log_level = config.log_level().unwrap_or(LogLevel::Info);
    let filter = match log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    debug!("Logging initialized with level: {:?}", log_level);
}

/// Exits with code 1 if global settings are invalid.
fn ensure_valid_settings(config: &Config) {
    if let Err(e) = validate_settings(config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
}

/// Main application entry point.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = resolve_config(&args)?;

    // A resource declared on the command line replaces the manifest's resources
    match &args.command {
        Some(Commands::Apply { resource, .. })
        | Some(Commands::Show { resource })
        | Some(Commands::Check { resource, .. }) => apply_resource_args(&mut config, resource)?,
        _ => {}
    }

    setup_logging(&config);

    if args.check_config {
        if let Err(e) = validate_effective_config(&config) {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        show_config(&config, &args.config_format)?;
        return Ok(());
    }

    let manifest_noop = config.noop.unwrap_or(false);

    match args.command {
        None => {
            ensure_valid_settings(&config);
            info!("No subcommand given, applying manifest");
            command_apply(&config, manifest_noop)
        }
        Some(Commands::Apply { noop, .. }) => {
            ensure_valid_settings(&config);
            command_apply(&config, noop || manifest_noop)
        }
        Some(Commands::Show { .. }) => command_show(&config),
        Some(Commands::Check { requirements, .. }) => command_check(requirements, &config),
        Some(Commands::Config {
            output,
            format,
            commented,
        }) => command_config(output, format, commented),
    }
}
