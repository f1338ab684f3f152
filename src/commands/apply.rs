//! Apply command implementation.
//!
//! Converges every declared resource and reports the outcome per resource.

use oomadjust::{apply_all, LinuxProvider, Outcome};
use tracing::info;

use crate::config::Config;

/// Converges declared resources. Fails if any resource failed.
pub fn command_apply(config: &Config, noop: bool) -> Result<(), Box<dyn std::error::Error>> {
    if config.resources.is_empty() {
        println!("ℹ️  No resources declared - nothing to do");
        return Ok(());
    }

    let provider = LinuxProvider::host(config.proc_root())?;
    info!(
        "Applying {} resource(s) against {}{}",
        config.resources.len(),
        provider.proc_root().display(),
        if noop { " (noop)" } else { "" }
    );

    let reports = apply_all(&config.resources, &provider, noop);

    let mut failed = 0;
    for report in &reports {
        match &report.result {
            Ok(outcome @ Outcome::Changed { .. }) => {
                println!("✅ oomadjust[{}]: {}", report.title, outcome)
            }
            Ok(outcome @ Outcome::WouldChange { .. }) => {
                println!("📝 oomadjust[{}]: {}", report.title, outcome)
            }
            Ok(outcome) => println!("➖ oomadjust[{}]: {}", report.title, outcome),
            Err(e) => {
                failed += 1;
                println!("❌ oomadjust[{}]: {}", report.title, e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} resource(s) failed", failed, reports.len()).into());
    }
    Ok(())
}
