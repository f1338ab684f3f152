//! Resource declarations and their validation.
//!
//! A [`ResourceDecl`] is what a manifest or the command line declares. It is
//! turned into an immutable [`OomAdjustResource`] by [`validate`], which
//! fills in host-dependent defaults and reports every violated constraint at
//! once. Nothing under `/proc/<pid>` is touched during validation; only the
//! PID file's existence and the modern-interface probe are checked.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::error::{ValidationError, Violation};
use crate::fs::FileAccess;

pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_PIDFILE_DIR: &str = "/var/run";

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid name pattern"));
static ADJUSTMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[1-9][0-9]*$").expect("valid adjustment pattern"));

/// Kernel interface used to store the OOM adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    /// `/proc/<pid>/oom_adj`, range -17..15
    Legacy,
    /// `/proc/<pid>/oom_score_adj`, range -1000..1000
    Modern,
}

impl Interface {
    pub fn from_legacy(legacy: bool) -> Self {
        if legacy {
            Interface::Legacy
        } else {
            Interface::Modern
        }
    }

    /// Probes `<proc_root>/self/oom_score_adj` to find the interface the host offers.
    pub fn detect<F: FileAccess + ?Sized>(fs: &F, proc_root: &Path) -> Self {
        let probe = proc_root.join("self").join(Interface::Modern.file_name());
        let interface = Interface::from_legacy(!fs.exists(&probe));
        debug!("Host OOM interface probe {}: {:?}", probe.display(), interface);
        interface
    }

    pub fn is_legacy(self) -> bool {
        self == Interface::Legacy
    }

    /// File name below `/proc/<pid>/`.
    pub fn file_name(self) -> &'static str {
        match self {
            Interface::Legacy => "oom_adj",
            Interface::Modern => "oom_score_adj",
        }
    }

    pub fn min(self) -> i32 {
        match self {
            Interface::Legacy => -17,
            Interface::Modern => -1000,
        }
    }

    pub fn max(self) -> i32 {
        match self {
            Interface::Legacy => 15,
            Interface::Modern => 1000,
        }
    }

    /// The value that should keep the process away from the OOM killer.
    /// Applied for the interface the host offers, whatever `legacy` says.
    pub fn default_adjustment(self) -> &'static str {
        match self {
            Interface::Legacy => "-17",
            Interface::Modern => "-1000",
        }
    }
}

/// Declared ensure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

impl FromStr for Ensure {
    type Err = Violation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Ensure::Present),
            "absent" => Ok(Ensure::Absent),
            other => Err(Violation::InvalidEnsure(other.to_string())),
        }
    }
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ensure::Present => f.write_str("present"),
            Ensure::Absent => f.write_str("absent"),
        }
    }
}

/// A scalar as written in a manifest: `legacy: yes`, `adjustment: -500`
/// and `adjustment: "-500"` are all accepted and checked as text.
///
/// Numbers outside `i64` and floats are kept as their text, so they fail
/// validation of their own resource instead of the manifest parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ScalarValue {
    /// Boolean coercion: native booleans and `true/false/yes/no` in any case.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(*b),
            ScalarValue::Text(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            ScalarValue::Int(_) => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Int(i) => write!(f, "{i}"),
            ScalarValue::Text(s) => f.write_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for ScalarValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScalarVisitor;

        impl<'de> Visitor<'de> for ScalarVisitor {
            type Value = ScalarValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a boolean, number or string")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<ScalarValue, E> {
                Ok(ScalarValue::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<ScalarValue, E> {
                Ok(ScalarValue::Int(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<ScalarValue, E> {
                Ok(i64::try_from(value)
                    .map(ScalarValue::Int)
                    .unwrap_or_else(|_| ScalarValue::Text(value.to_string())))
            }

            fn visit_i128<E: de::Error>(self, value: i128) -> Result<ScalarValue, E> {
                Ok(ScalarValue::Text(value.to_string()))
            }

            fn visit_u128<E: de::Error>(self, value: u128) -> Result<ScalarValue, E> {
                Ok(ScalarValue::Text(value.to_string()))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<ScalarValue, E> {
                // Debug keeps the fraction, so -5.0 stays distinct from -5
                Ok(ScalarValue::Text(format!("{value:?}")))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ScalarValue, E> {
                Ok(ScalarValue::Text(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<ScalarValue, E> {
                Ok(ScalarValue::Text(value))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        ScalarValue::Int(i)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Text(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Text(s)
    }
}

/// A resource as declared, before defaults and validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDecl {
    /// Resource title; the process name when `name` is not set.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pidfile: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy: Option<ScalarValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<ScalarValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensure: Option<String>,
}

impl ResourceDecl {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn pidfile(mut self, pidfile: impl Into<PathBuf>) -> Self {
        self.pidfile = Some(pidfile.into());
        self
    }

    pub fn legacy(mut self, legacy: impl Into<ScalarValue>) -> Self {
        self.legacy = Some(legacy.into());
        self
    }

    pub fn adjustment(mut self, adjustment: impl Into<ScalarValue>) -> Self {
        self.adjustment = Some(adjustment.into());
        self
    }

    pub fn ensure(mut self, ensure: impl Into<String>) -> Self {
        self.ensure = Some(ensure.into());
        self
    }

    /// Process name: `name` if declared, otherwise the title.
    pub fn effective_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.title)
    }

    pub fn validate<F: FileAccess + ?Sized>(
        &self,
        fs: &F,
        proc_root: &Path,
    ) -> Result<OomAdjustResource, ValidationError> {
        validate(self, fs, proc_root)
    }
}

/// Ordering dependency the resource declares on other resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Apply after the service of this name is managed.
    Service(String),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Service(name) => write!(f, "Service[{name}]"),
        }
    }
}

/// A validated OOM adjustment resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OomAdjustResource {
    title: String,
    name: String,
    pidfile: PathBuf,
    interface: Interface,
    adjustment: String,
    ensure: Ensure,
}

impl OomAdjustResource {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pidfile(&self) -> &Path {
        &self.pidfile
    }

    pub fn interface(&self) -> Interface {
        self.interface
    }

    pub fn legacy(&self) -> bool {
        self.interface.is_legacy()
    }

    /// Desired value, exactly as it will be written to the kernel file.
    pub fn adjustment(&self) -> &str {
        &self.adjustment
    }

    pub fn ensure(&self) -> Ensure {
        self.ensure
    }

    pub fn autorequires(&self) -> Vec<Requirement> {
        vec![Requirement::Service(self.name.clone())]
    }
}

/// Default PID file for a process name.
pub fn default_pidfile(name: &str) -> PathBuf {
    Path::new(DEFAULT_PIDFILE_DIR).join(format!("{name}.pid"))
}

/// Validates a declaration and fills in its defaults.
///
/// The modern interface is assumed present when `<proc_root>/self/oom_score_adj`
/// exists; that decides the default for `legacy`. The default adjustment
/// follows the interface that ends up selected.
pub fn validate<F: FileAccess + ?Sized>(
    decl: &ResourceDecl,
    fs: &F,
    proc_root: &Path,
) -> Result<OomAdjustResource, ValidationError> {
    debug!("Validating oomadjust[{}]", decl.title);
    let mut violations = Vec::new();

    let name = decl.effective_name().to_string();
    if !NAME_PATTERN.is_match(&name) {
        violations.push(Violation::InvalidName(name.clone()));
    }

    let pidfile = decl
        .pidfile
        .clone()
        .unwrap_or_else(|| default_pidfile(&name));
    if !pidfile.is_absolute() {
        violations.push(Violation::RelativePidfile(pidfile.clone()));
    } else if !fs.exists(&pidfile) {
        violations.push(Violation::MissingPidfile(pidfile.clone()));
    }

    let host = Interface::detect(fs, proc_root);
    let interface = match &decl.legacy {
        None => Some(host),
        Some(value) => match value.as_bool() {
            Some(legacy) => Some(Interface::from_legacy(legacy)),
            None => {
                violations.push(Violation::InvalidLegacy(value.to_string()));
                None
            }
        },
    };

    let ensure = match decl.ensure.as_deref() {
        None => Ensure::default(),
        Some(s) => s.parse().unwrap_or_else(|v| {
            violations.push(v);
            Ensure::default()
        }),
    };

    let adjustment = match &decl.adjustment {
        Some(value) => value.to_string(),
        None => host.default_adjustment().to_string(),
    };
    if !ADJUSTMENT_PATTERN.is_match(&adjustment) {
        violations.push(Violation::InvalidAdjustment(adjustment.clone()));
    } else if let Some(interface) = interface {
        let in_range = adjustment
            .parse::<i32>()
            .is_ok_and(|v| (interface.min()..=interface.max()).contains(&v));
        if !in_range {
            violations.push(Violation::AdjustmentOutOfRange {
                value: adjustment.clone(),
                min: interface.min(),
                max: interface.max(),
            });
        }
    }

    match interface {
        Some(interface) if violations.is_empty() => {
            debug!(
                "oomadjust[{}]: name={} pidfile={} interface={:?} adjustment={} ensure={}",
                decl.title,
                name,
                pidfile.display(),
                interface,
                adjustment,
                ensure
            );
            Ok(OomAdjustResource {
                title: decl.title.clone(),
                name,
                pidfile,
                interface,
                adjustment,
                ensure,
            })
        }
        _ => Err(ValidationError {
            title: decl.title.clone(),
            violations,
        }),
    }
}
