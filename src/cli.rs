//! CLI arguments and subcommands for oomadjust.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("VERGEN_BUILD_TIMESTAMP"),
    ")"
);

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "oomadjust",
    about = "Keep the OOM killer adjustment of processes at a declared value",
    long_about = "Keep the OOM killer adjustment of processes at a declared value.\n\n\
                  Each resource names a process whose PID is read from a PID file. The \
                  adjustment is written to /proc/<pid>/oom_score_adj, or to /proc/<pid>/oom_adj \
                  when the legacy interface is selected. Running without a subcommand applies \
                  the manifest.",
    version,
    long_version = LONG_VERSION,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level [default: info]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Manifest file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all manifest file loading
    #[arg(long)]
    pub no_config: bool,

    /// Location of the proc filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Print effective merged configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate configuration and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Declares a single resource on the command line.
///
/// When a title is given, it replaces the resources of the manifest.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ResourceArgs {
    /// Resource title (process name unless --name is given)
    pub title: Option<String>,

    /// Process name used to locate the PID file
    #[arg(long)]
    pub name: Option<String>,

    /// Absolute path of the PID file [default: /var/run/<name>.pid]
    #[arg(long)]
    pub pidfile: Option<PathBuf>,

    /// Use the legacy oom_adj interface (--legacy, --legacy=false)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub legacy: Option<String>,

    /// Adjustment to set (-1000..1000, or -17..15 with --legacy)
    #[arg(long, allow_hyphen_values = true)]
    pub adjustment: Option<String>,

    /// present or absent
    #[arg(long)]
    pub ensure: Option<String>,
}

impl ResourceArgs {
    /// True if any per-resource flag was given.
    pub fn has_flags(&self) -> bool {
        self.name.is_some()
            || self.pidfile.is_some()
            || self.legacy.is_some()
            || self.adjustment.is_some()
            || self.ensure.is_some()
    }
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converge declared resources to their adjustment
    Apply {
        #[command(flatten)]
        resource: ResourceArgs,

        /// Report what would change without writing
        #[arg(long)]
        noop: bool,
    },

    /// Show target file, current and desired value of each resource
    Show {
        #[command(flatten)]
        resource: ResourceArgs,
    },

    /// Validate declarations and, optionally, host requirements
    Check {
        #[command(flatten)]
        resource: ResourceArgs,

        /// Also check kernel interface and privileges
        #[arg(long)]
        requirements: bool,
    },

    /// Generate an example manifest
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}
