//! Show command implementation.
//!
//! Displays the resolved kernel file, current and desired value of each
//! declared resource without writing anything.

use oomadjust::{HostFs, LinuxProvider, ResourceDecl};

use crate::config::Config;

/// Shows the state of declared resources.
pub fn command_show(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔎 oomadjust - Resource State");
    println!("=============================");

    if config.resources.is_empty() {
        println!("\nℹ️  No resources declared");
        return Ok(());
    }

    let provider = LinuxProvider::host(config.proc_root())?;

    for decl in &config.resources {
        show_resource(decl, &provider);
    }

    Ok(())
}

fn show_resource(decl: &ResourceDecl, provider: &LinuxProvider<HostFs>) {
    println!("\n🏷️  oomadjust[{}]", decl.title);

    let resource = match decl.validate(provider.fs(), provider.proc_root()) {
        Ok(r) => r,
        Err(e) => {
            for violation in &e.violations {
                println!("   ❌ {}", violation);
            }
            return;
        }
    };

    let current = provider.current_value(&resource);
    let desired = resource.adjustment();
    let requires: Vec<String> = resource
        .autorequires()
        .iter()
        .map(|r| r.to_string())
        .collect();

    println!("   ├─ Process: {}", resource.name());
    println!("   ├─ PID file: {}", resource.pidfile().display());
    println!("   ├─ Interface: {}", resource.interface().file_name());
    println!("   ├─ Target: {}", provider.resolve_target(&resource));
    println!("   ├─ Current: {}", current.as_deref().unwrap_or("unknown"));
    println!("   ├─ Desired: {} (ensure => {})", desired, resource.ensure());
    println!("   ├─ Requires: {}", requires.join(", "));

    if current.as_deref() == Some(desired) {
        println!("   └─ ✅ in sync");
    } else {
        println!("   └─ 📝 out of sync");
    }
}
