//! Linux provider for the OOM adjustment resource.
//!
//! The provider maps a validated [`OomAdjustResource`] onto the kernel file
//! that stores its process's adjustment:
//! - `resolve_target`: PID file -> `/proc/<pid>/oom_adj` or `oom_score_adj`
//! - `current_value`: first line of that file, if readable
//! - `set_value`: overwrite the file with the desired value
//! - `exists`: the declared ensure state, unconditionally

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ProviderError;
use crate::fs::{FileAccess, HostFs};
use crate::resource::{Ensure, OomAdjustResource};

/// Kernel file holding a process's adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustTarget {
    /// No PID could be read from the PID file.
    Undefined,
    File(PathBuf),
}

impl fmt::Display for AdjustTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustTarget::Undefined => f.write_str("undefined"),
            AdjustTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// True when running on a Linux kernel.
pub fn is_supported() -> bool {
    cfg!(target_os = "linux")
}

#[derive(Debug)]
pub struct LinuxProvider<F> {
    fs: F,
    proc_root: PathBuf,
}

impl LinuxProvider<HostFs> {
    /// Provider for the live host. Fails on anything but Linux.
    pub fn host(proc_root: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        if !is_supported() {
            return Err(ProviderError::Unsupported {
                os: std::env::consts::OS.to_string(),
            });
        }
        Ok(Self::with_fs(HostFs, proc_root))
    }
}

impl<F: FileAccess> LinuxProvider<F> {
    /// Provider over an arbitrary file backend. No platform check.
    pub fn with_fs(fs: F, proc_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_root: proc_root.into(),
        }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    /// Reads the first line of a file, or `None` for any failure.
    fn value_in_file(&self, path: &Path) -> Option<String> {
        match self.fs.read_first_line(path) {
            Ok(line) => Some(line),
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Finds the kernel file for the resource's current PID.
    pub fn resolve_target(&self, resource: &OomAdjustResource) -> AdjustTarget {
        debug!("Reading PID from file {}", resource.pidfile().display());

        let Some(line) = self.value_in_file(resource.pidfile()) else {
            return AdjustTarget::Undefined;
        };
        let pid = match line.trim().parse::<u32>() {
            Ok(pid) if pid > 0 => pid,
            _ => {
                debug!(
                    "PID file {} does not hold a PID: {:?}",
                    resource.pidfile().display(),
                    line
                );
                return AdjustTarget::Undefined;
            }
        };

        let file = self
            .proc_root
            .join(pid.to_string())
            .join(resource.interface().file_name());
        debug!("Using OOM adjustment for PID {} in {}", pid, file.display());

        AdjustTarget::File(file)
    }

    /// Current adjustment, or `None` when it cannot be read.
    pub fn current_value(&self, resource: &OomAdjustResource) -> Option<String> {
        let value = match self.resolve_target(resource) {
            AdjustTarget::Undefined => None,
            AdjustTarget::File(path) => self.value_in_file(&path),
        };

        debug!(
            "OOM adjustment for {} is {}",
            resource.name(),
            value.as_deref().unwrap_or("unknown")
        );

        value
    }

    /// Writes the resource's adjustment to its kernel file.
    ///
    /// Returns the file written. The value is not read back.
    pub fn set_value(&self, resource: &OomAdjustResource) -> Result<PathBuf, ProviderError> {
        let path = match self.resolve_target(resource) {
            AdjustTarget::File(path) => path,
            AdjustTarget::Undefined => {
                return Err(ProviderError::PidUnknown {
                    name: resource.name().to_string(),
                    pidfile: resource.pidfile().to_path_buf(),
                });
            }
        };

        debug!(
            "Setting OOM adjustment for process '{}' to '{}' in {}",
            resource.name(),
            resource.adjustment(),
            path.display()
        );

        self.fs
            .overwrite(&path, resource.adjustment())
            .map_err(|source| ProviderError::Write {
                name: resource.name().to_string(),
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }

    /// The kernel file cannot be created or removed, so the declared state
    /// is always reported as the actual one.
    pub fn exists(&self, resource: &OomAdjustResource) -> Ensure {
        resource.ensure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::resource::ResourceDecl;

    fn modern_host() -> MemoryFs {
        let fs = MemoryFs::new();
        fs.insert("/proc/self/oom_score_adj", "0\n").unwrap();
        fs.insert("/var/run/rsyslogd.pid", "4821\n").unwrap();
        fs.insert("/proc/4821/oom_score_adj", "0\n").unwrap();
        fs.insert("/proc/4821/oom_adj", "0\n").unwrap();
        fs
    }

    fn resource(decl: ResourceDecl, fs: &MemoryFs) -> OomAdjustResource {
        decl.validate(fs, Path::new("/proc"))
            .expect("declaration should be valid")
    }

    #[test]
    fn test_resolve_modern_target() {
        let fs = modern_host();
        let res = resource(ResourceDecl::new("rsyslogd"), &fs);
        let provider = LinuxProvider::with_fs(&fs, "/proc");

        assert_eq!(
            provider.resolve_target(&res),
            AdjustTarget::File(PathBuf::from("/proc/4821/oom_score_adj"))
        );
    }

    #[test]
    fn test_resolve_legacy_target() {
        let fs = modern_host();
        let res = resource(
            ResourceDecl::new("rsyslogd").legacy(true).adjustment("-10"),
            &fs,
        );
        let provider = LinuxProvider::with_fs(&fs, "/proc");

        assert_eq!(
            provider.resolve_target(&res),
            AdjustTarget::File(PathBuf::from("/proc/4821/oom_adj"))
        );
    }

    #[test]
    fn test_unreadable_pidfile_is_undefined() {
        let fs = modern_host();
        let res = resource(ResourceDecl::new("rsyslogd"), &fs);
        fs.remove(Path::new("/var/run/rsyslogd.pid"));
        let provider = LinuxProvider::with_fs(&fs, "/proc");

        let target = provider.resolve_target(&res);
        assert_eq!(target, AdjustTarget::Undefined);
        assert_eq!(target.to_string(), "undefined");
        assert_eq!(provider.current_value(&res), None);
    }

    #[test]
    fn test_garbage_pidfile_is_undefined() {
        let fs = modern_host();
        let res = resource(ResourceDecl::new("rsyslogd"), &fs);
        let provider = LinuxProvider::with_fs(&fs, "/proc");

        for content in ["", "\n", "../../etc\n", "0\n", "-3\n", "abc"] {
            fs.insert("/var/run/rsyslogd.pid", content).unwrap();
            assert_eq!(
                provider.resolve_target(&res),
                AdjustTarget::Undefined,
                "pid file content {content:?}"
            );
        }
    }

    #[test]
    fn test_current_value() {
        let fs = modern_host();
        fs.insert("/proc/4821/oom_score_adj", "-300\n").unwrap();
        let res = resource(ResourceDecl::new("rsyslogd"), &fs);
        let provider = LinuxProvider::with_fs(&fs, "/proc");

        assert_eq!(provider.current_value(&res).as_deref(), Some("-300"));

        fs.remove(Path::new("/proc/4821/oom_score_adj"));
        assert_eq!(provider.current_value(&res), None);
    }

    #[test]
    fn test_set_value_writes_exact_value() {
        let fs = modern_host();
        let res = resource(ResourceDecl::new("rsyslogd").adjustment("-500"), &fs);
        let provider = LinuxProvider::with_fs(&fs, "/proc");

        let path = provider.set_value(&res).unwrap();
        assert_eq!(path, PathBuf::from("/proc/4821/oom_score_adj"));
        assert_eq!(
            fs.contents(Path::new("/proc/4821/oom_score_adj")).as_deref(),
            Some("-500")
        );
        assert_eq!(provider.current_value(&res).as_deref(), Some("-500"));
    }

    #[test]
    fn test_set_value_without_pid_fails() {
        let fs = modern_host();
        let res = resource(ResourceDecl::new("rsyslogd"), &fs);
        fs.insert("/var/run/rsyslogd.pid", "").unwrap();
        let provider = LinuxProvider::with_fs(&fs, "/proc");

        let err = provider.set_value(&res).unwrap_err();
        assert!(matches!(err, ProviderError::PidUnknown { .. }));
        assert!(!fs.exists(Path::new("undefined")));
    }

    #[test]
    fn test_set_value_on_missing_interface_fails() {
        let fs = modern_host();
        fs.remove(Path::new("/proc/4821/oom_adj"));
        let res = resource(
            ResourceDecl::new("rsyslogd").legacy(true).adjustment("-10"),
            &fs,
        );
        let provider = LinuxProvider::with_fs(&fs, "/proc");

        match provider.set_value(&res) {
            Err(ProviderError::Write { name, path, .. }) => {
                assert_eq!(name, "rsyslogd");
                assert_eq!(path, PathBuf::from("/proc/4821/oom_adj"));
            }
            other => panic!("expected write error, got {other:?}"),
        }
    }

    #[test]
    fn test_exists_reports_declared_ensure() {
        let fs = modern_host();
        let provider = LinuxProvider::with_fs(&fs, "/proc");

        let present = resource(ResourceDecl::new("rsyslogd"), &fs);
        let absent = resource(ResourceDecl::new("rsyslogd").ensure("absent"), &fs);

        fs.remove(Path::new("/proc/4821/oom_score_adj"));
        assert_eq!(provider.exists(&present), Ensure::Present);
        assert_eq!(provider.exists(&absent), Ensure::Absent);
    }

    #[test]
    fn test_host_provider_on_linux() {
        assert_eq!(LinuxProvider::host("/proc").is_ok(), is_supported());
    }
}
