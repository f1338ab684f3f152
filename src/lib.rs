//! oomadjust library
//!
//! Keeps the Linux OOM killer adjustment of a process at a declared value.
//! The process is located through its PID file, and the value is written to
//! `/proc/<pid>/oom_score_adj` or, on old kernels, `/proc/<pid>/oom_adj`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use oomadjust::{converge, LinuxProvider, ResourceDecl};
//!
//! let provider = LinuxProvider::host("/proc").expect("Linux host");
//! let resource = ResourceDecl::new("rsyslogd")
//!     .adjustment("-500")
//!     .validate(provider.fs(), provider.proc_root())
//!     .expect("valid declaration");
//!
//! let outcome = converge(&resource, &provider, false).expect("write succeeded");
//! println!("oomadjust[{}]: {}", resource.title(), outcome);
//! ```
//!
//! All file access goes through [`FileAccess`]; [`MemoryFs`] replaces the
//! live kernel in tests.

pub mod apply;
pub mod error;
pub mod fs;
pub mod provider;
pub mod resource;

// Re-export main types for convenience
pub use apply::{apply_all, converge, ApplyError, Outcome, ResourceReport};
pub use error::{ProviderError, ValidationError, Violation};
pub use fs::{FileAccess, HostFs, MemoryFs};
pub use provider::{is_supported, AdjustTarget, LinuxProvider};
pub use resource::{
    validate, Ensure, Interface, OomAdjustResource, Requirement, ResourceDecl, ScalarValue,
    DEFAULT_PROC_ROOT,
};
