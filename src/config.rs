//! Manifest loading for oomadjust.
//!
//! This module handles loading, merging, and validating the manifest from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use anyhow::{bail, Context};
use clap::ValueEnum;
use oomadjust::{HostFs, ResourceDecl, ScalarValue, ValidationError, DEFAULT_PROC_ROOT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Args, ConfigFormat, LogLevel, ResourceArgs};

/// Manifest locations tried when no file is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/oomadjust/oomadjust.yaml",
    "/etc/oomadjust/oomadjust.yml",
    "/etc/oomadjust/oomadjust.json",
    "/etc/oomadjust/oomadjust.toml",
    "./oomadjust.yaml",
];

/// Effective configuration: global settings plus declared resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// off, error, warn, info, debug, trace
    #[serde(default, alias = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(default, alias = "proc-root", skip_serializing_if = "Option::is_none")]
    pub proc_root: Option<PathBuf>,

    /// Report changes without writing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noop: Option<bool>,

    // Must stay last: TOML needs tables after plain values.
    #[serde(default)]
    pub resources: Vec<ResourceDecl>,
}

impl Config {
    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    /// Log level from the manifest, if set and valid.
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
            .as_deref()
            .and_then(|s| LogLevel::from_str(s, true).ok())
    }

    /// Manifest written by the `config` subcommand.
    pub fn example() -> Self {
        Self {
            log_level: Some("info".into()),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            noop: Some(false),
            resources: vec![
                ResourceDecl::new("rsyslogd"),
                ResourceDecl::new("sshd").adjustment("-500"),
                ResourceDecl::new("web")
                    .name("nginx")
                    .pidfile("/run/nginx.pid")
                    .legacy(ScalarValue::Bool(false))
                    .adjustment("-250"),
            ],
        }
    }
}

/// Validate effective config (used by --check-config and before applying)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    validate_settings(cfg)?;

    let errors = validate_resources(cfg);
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(messages.join("\n").into());
    }

    Ok(())
}

/// Validate global settings and declaration titles, without touching the host.
pub fn validate_settings(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::from_str(level, true).is_err() {
            return Err(format!(
                "Invalid log_level '{}', expected off/error/warn/info/debug/trace",
                level
            )
            .into());
        }
    }

    let mut seen = HashSet::new();
    for decl in &cfg.resources {
        if !seen.insert(decl.title.as_str()) {
            return Err(format!("Duplicate declaration: oomadjust[{}]", decl.title).into());
        }
    }

    Ok(())
}

/// Validates every declared resource against the host, collecting all failures.
pub fn validate_resources(cfg: &Config) -> Vec<ValidationError> {
    let proc_root = cfg.proc_root();
    cfg.resources
        .iter()
        .filter_map(|decl| decl.validate(&HostFs, &proc_root).err())
        .collect()
}

/// Resolves configuration from CLI args, manifest file, and defaults.
/// This enforces precedence: CLI (if provided) > manifest > default.
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(proc_root) = &args.proc_root {
        config.proc_root = Some(proc_root.clone());
    }

    if let Some(level) = args.log_level {
        if let Some(value) = level.to_possible_value() {
            config.log_level = Some(value.get_name().to_string());
        }
    }

    Ok(config)
}

/// Replaces the manifest's resources with one declared on the command line.
pub fn apply_resource_args(config: &mut Config, args: &ResourceArgs) -> anyhow::Result<()> {
    let Some(title) = &args.title else {
        if args.has_flags() {
            bail!("Resource options (--name, --pidfile, ...) require a TITLE");
        }
        return Ok(());
    };

    let mut decl = ResourceDecl::new(title.clone());
    decl.name = args.name.clone();
    decl.pidfile = args.pidfile.clone();
    decl.legacy = args.legacy.clone().map(ScalarValue::Text);
    decl.adjustment = args.adjustment.clone().map(ScalarValue::Text);
    decl.ensure = args.ensure.clone();

    config.resources = vec![decl];
    Ok(())
}

/// Manifest loading with multiple format support
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("Manifest file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON manifest {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML manifest {}", path.display()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML manifest {}", path.display()))?,
    };

    info!(
        "Loaded {} resource(s) from: {}",
        config.resources.len(),
        path.display()
    );
    Ok(config)
}

/// Renders configuration in the requested format
pub fn render_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<String> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
