//! Error types for declaration validation and kernel file access.
//!
//! Validation collects every violated constraint of a declaration before any
//! file under `/proc` is touched. Read failures never become errors (they are
//! reported as an absent value), so the provider only fails on writes.

use std::io;
use std::path::PathBuf;

/// A single constraint violated by a resource declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("name '{0}' must match [a-zA-Z0-9_-]+")]
    InvalidName(String),

    #[error("pidfile {0} must be an absolute path")]
    RelativePidfile(PathBuf),

    #[error("pidfile {0} does not exist")]
    MissingPidfile(PathBuf),

    #[error("legacy '{0}' is not a boolean (expected true/false/yes/no)")]
    InvalidLegacy(String),

    #[error("adjustment '{0}' must match ^-?[1-9][0-9]*$")]
    InvalidAdjustment(String),

    #[error("adjustment {value} must be in range {min}..{max}")]
    AdjustmentOutOfRange { value: String, min: i32, max: i32 },

    #[error("ensure '{0}' must be 'present' or 'absent'")]
    InvalidEnsure(String),
}

/// All violations found for one declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid oomadjust[{title}]: {}", join_violations(.violations))]
pub struct ValidationError {
    pub title: String,
    pub violations: Vec<Violation>,
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures of the Linux provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to set OOM adjustment for '{name}' in {}: {source}", .path.display())]
    Write {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot set OOM adjustment for '{name}': no PID readable from {}", .pidfile.display())]
    PidUnknown { name: String, pidfile: PathBuf },

    #[error("oomadjust is only supported on Linux (running on {os})")]
    Unsupported { os: String },
}
