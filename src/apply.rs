//! Convergence of declared resources against the kernel.
//!
//! Each resource is handled on its own: read the current value, compare it
//! with the desired one and write only when they differ. A failure of one
//! resource never stops the others.

use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ValidationError};
use crate::fs::FileAccess;
use crate::provider::LinuxProvider;
use crate::resource::{Ensure, OomAdjustResource, ResourceDecl};

/// Result of converging one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `ensure => absent`: the adjustment is not managed.
    Unmanaged,
    InSync {
        value: String,
    },
    /// Noop mode: the value differs but nothing was written.
    WouldChange {
        from: Option<String>,
        to: String,
    },
    Changed {
        from: Option<String>,
        to: String,
    },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = |v: &Option<String>| v.clone().unwrap_or_else(|| "absent".to_string());
        match self {
            Outcome::Unmanaged => f.write_str("unmanaged (ensure => absent)"),
            Outcome::InSync { value } => write!(f, "in sync at {value}"),
            Outcome::WouldChange { from, to } => {
                write!(f, "would change {} -> {} (noop)", shown(from), to)
            }
            Outcome::Changed { from, to } => write!(f, "changed {} -> {}", shown(from), to),
        }
    }
}

/// Per-resource error, either before or during convergence.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Report for one declared resource.
#[derive(Debug)]
pub struct ResourceReport {
    pub title: String,
    pub result: Result<Outcome, ApplyError>,
}

/// Brings one validated resource to its desired adjustment.
pub fn converge<F: FileAccess>(
    resource: &OomAdjustResource,
    provider: &LinuxProvider<F>,
    noop: bool,
) -> Result<Outcome, ProviderError> {
    if provider.exists(resource) == Ensure::Absent {
        debug!("oomadjust[{}] is absent, not managing adjustment", resource.title());
        return Ok(Outcome::Unmanaged);
    }

    let desired = resource.adjustment();
    let current = provider.current_value(resource);

    if current.as_deref() == Some(desired) {
        debug!("oomadjust[{}] already at {}", resource.title(), desired);
        return Ok(Outcome::InSync {
            value: desired.to_string(),
        });
    }

    if noop {
        info!(
            "oomadjust[{}]: adjustment is {}, should be {} (noop)",
            resource.title(),
            current.as_deref().unwrap_or("absent"),
            desired
        );
        return Ok(Outcome::WouldChange {
            from: current,
            to: desired.to_string(),
        });
    }

    let path = provider.set_value(resource)?;

    let confirmed = provider.current_value(resource);
    if confirmed.as_deref() != Some(desired) {
        warn!(
            "oomadjust[{}]: wrote {} to {} but read back {}",
            resource.title(),
            desired,
            path.display(),
            confirmed.as_deref().unwrap_or("nothing")
        );
    }

    info!(
        "oomadjust[{}]: adjustment changed {} -> {}",
        resource.title(),
        current.as_deref().unwrap_or("absent"),
        desired
    );

    Ok(Outcome::Changed {
        from: current,
        to: desired.to_string(),
    })
}

/// Validates and converges every declaration independently.
pub fn apply_all<F: FileAccess>(
    decls: &[ResourceDecl],
    provider: &LinuxProvider<F>,
    noop: bool,
) -> Vec<ResourceReport> {
    decls
        .iter()
        .map(|decl| {
            let result = decl
                .validate(provider.fs(), provider.proc_root())
                .map_err(ApplyError::from)
                .and_then(|resource| {
                    converge(&resource, provider, noop).map_err(ApplyError::from)
                });

            if let Err(e) = &result {
                warn!("{}", e);
            }

            ResourceReport {
                title: decl.title.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use std::path::Path;

    fn host() -> MemoryFs {
        let fs = MemoryFs::new();
        fs.insert("/proc/self/oom_score_adj", "0\n").unwrap();
        fs.insert("/var/run/rsyslogd.pid", "4821\n").unwrap();
        fs.insert("/proc/4821/oom_score_adj", "0\n").unwrap();
        fs
    }

    fn validated(decl: ResourceDecl, fs: &MemoryFs) -> OomAdjustResource {
        decl.validate(fs, Path::new("/proc")).unwrap()
    }

    #[test]
    fn test_converge_changes_value() {
        let fs = host();
        let provider = LinuxProvider::with_fs(&fs, "/proc");
        let res = validated(ResourceDecl::new("rsyslogd").adjustment("-500"), &fs);

        let outcome = converge(&res, &provider, false).unwrap();
        assert_eq!(
            outcome,
            Outcome::Changed {
                from: Some("0".to_string()),
                to: "-500".to_string()
            }
        );
        assert_eq!(
            fs.contents(Path::new("/proc/4821/oom_score_adj")).as_deref(),
            Some("-500")
        );

        // Second pass has nothing to do.
        let outcome = converge(&res, &provider, false).unwrap();
        assert_eq!(
            outcome,
            Outcome::InSync {
                value: "-500".to_string()
            }
        );
    }

    #[test]
    fn test_converge_noop_does_not_write() {
        let fs = host();
        let provider = LinuxProvider::with_fs(&fs, "/proc");
        let res = validated(ResourceDecl::new("rsyslogd"), &fs);

        let outcome = converge(&res, &provider, true).unwrap();
        assert_eq!(
            outcome,
            Outcome::WouldChange {
                from: Some("0".to_string()),
                to: "-1000".to_string()
            }
        );
        assert_eq!(
            fs.contents(Path::new("/proc/4821/oom_score_adj")).as_deref(),
            Some("0\n")
        );
    }

    #[test]
    fn test_converge_absent_is_unmanaged() {
        let fs = host();
        let provider = LinuxProvider::with_fs(&fs, "/proc");
        let res = validated(ResourceDecl::new("rsyslogd").ensure("absent"), &fs);

        assert_eq!(converge(&res, &provider, false).unwrap(), Outcome::Unmanaged);
        assert_eq!(
            fs.contents(Path::new("/proc/4821/oom_score_adj")).as_deref(),
            Some("0\n")
        );
    }

    #[test]
    fn test_converge_process_gone_fails() {
        let fs = host();
        let provider = LinuxProvider::with_fs(&fs, "/proc");
        let res = validated(ResourceDecl::new("rsyslogd"), &fs);
        fs.remove(Path::new("/proc/4821/oom_score_adj"));

        let err = converge(&res, &provider, false).unwrap_err();
        assert!(matches!(err, ProviderError::Write { .. }));
    }

    #[test]
    fn test_apply_all_isolates_failures() {
        let fs = host();
        fs.insert("/var/run/sshd.pid", "77\n").unwrap();
        let provider = LinuxProvider::with_fs(&fs, "/proc");

        let decls = vec![
            ResourceDecl::new("sshd"),
            ResourceDecl::new("cron"),
            ResourceDecl::new("rsyslogd").adjustment("-250"),
        ];
        let reports = apply_all(&decls, &provider, false);

        assert_eq!(reports.len(), 3);
        assert!(matches!(
            reports[0].result,
            Err(ApplyError::Provider(ProviderError::Write { .. }))
        ));
        assert!(matches!(reports[1].result, Err(ApplyError::Invalid(_))));
        assert!(matches!(reports[2].result, Ok(Outcome::Changed { .. })));
        assert_eq!(
            fs.contents(Path::new("/proc/4821/oom_score_adj")).as_deref(),
            Some("-250")
        );
    }

    #[test]
    fn test_outcome_display() {
        let outcome = Outcome::Changed {
            from: None,
            to: "-1000".to_string(),
        };
        assert_eq!(outcome.to_string(), "changed absent -> -1000");
    }
}
