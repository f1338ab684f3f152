//! CLI command implementations for oomadjust.
//!
//! This module provides implementations for all CLI subcommands:
//! - `apply`: Converge declared resources
//! - `show`: Display current and desired state
//! - `check`: Validate declarations and host requirements
//! - `config`: Example manifest generation

pub mod apply;
pub mod check;
pub mod config;
pub mod show;

// Re-export command functions
pub use apply::command_apply;
pub use check::command_check;
pub use config::command_config;
pub use show::command_show;
