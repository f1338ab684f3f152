//! Host requirement validation for oomadjust.
//!
//! This module checks that the host offers an OOM adjustment interface and
//! that we are allowed to lower adjustments before anything is applied.

use nix::unistd::geteuid;
use oomadjust::{is_supported, Interface};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(proc_root: &Path) -> Result<(), RequirementError> {
    info!("🔍 Validating runtime requirements...");

    check_platform()?;
    check_proc_access(proc_root)?;
    check_oom_interface(proc_root)?;
    check_user_privileges();

    info!("✅ All runtime requirements validated");
    Ok(())
}

fn check_platform() -> Result<(), RequirementError> {
    if !is_supported() {
        error!("❌ oomadjust only manages Linux kernels");
        return Err(RequirementError::Unsupported(
            std::env::consts::OS.to_string(),
        ));
    }
    debug!("Platform: {}", std::env::consts::OS);
    Ok(())
}

/// Check the proc filesystem is mounted and readable
fn check_proc_access(proc_root: &Path) -> Result<(), RequirementError> {
    match fs::metadata(proc_root.join("self")) {
        Ok(_) => {
            info!("✅ {} is accessible", proc_root.display());
            Ok(())
        }
        Err(e) => {
            error!("❌ Cannot access {}/self: {}", proc_root.display(), e);
            error!("   Solution: mount -t proc proc {}", proc_root.display());
            Err(RequirementError::ProcUnavailable(format!(
                "{}: {}",
                proc_root.display(),
                e
            )))
        }
    }
}

/// Check which kernel interface is available
fn check_oom_interface(proc_root: &Path) -> Result<(), RequirementError> {
    let self_dir = proc_root.join("self");

    if self_dir.join(Interface::Modern.file_name()).exists() {
        info!("✅ oom_score_adj interface available (-1000..1000)");
        Ok(())
    } else if self_dir.join(Interface::Legacy.file_name()).exists() {
        warn!("⚠️  Only the legacy oom_adj interface is available (-17..15)");
        warn!("   Resources default to legacy => true on this host");
        Ok(())
    } else {
        error!("❌ Neither oom_score_adj nor oom_adj found in {}", self_dir.display());
        Err(RequirementError::NoOomInterface)
    }
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - lowering an adjustment needs CAP_SYS_RESOURCE");
        warn!("   Writes to other users' processes will fail");
        // Not an error - raising adjustments of own processes still works
    } else {
        info!("✅ Running as root (uid=0)");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequirementError {
    #[error("Unsupported platform: {0} (Linux required)")]
    Unsupported(String),

    #[error("proc filesystem not accessible at {0}")]
    ProcUnavailable(String),

    #[error("Kernel offers neither oom_score_adj nor oom_adj")]
    NoOomInterface,
}
