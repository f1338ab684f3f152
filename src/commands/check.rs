//! Check command implementation.
//!
//! Validates declarations and, on request, host requirements.

use oomadjust::HostFs;

use crate::config::{validate_settings, Config};
use crate::startup_checks::validate_requirements;

/// Validates declarations and system requirements.
pub fn command_check(
    requirements: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 oomadjust - Declaration Check");
    println!("================================");

    let mut all_ok = true;
    let proc_root = config.proc_root();

    if requirements {
        println!("\n🐧 Checking host requirements...");
        match validate_requirements(&proc_root) {
            Ok(()) => println!("   ✅ Kernel interface and /proc accessible"),
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }
    }

    println!("\n📋 Checking {} declaration(s)...", config.resources.len());
    for decl in &config.resources {
        match decl.validate(&HostFs, &proc_root) {
            Ok(resource) => {
                let requires: Vec<String> = resource
                    .autorequires()
                    .iter()
                    .map(|r| r.to_string())
                    .collect();
                println!(
                    "   ✅ oomadjust[{}]: {} -> {} ({}), after {}",
                    resource.title(),
                    resource.pidfile().display(),
                    resource.adjustment(),
                    resource.interface().file_name(),
                    requires.join(", ")
                );
            }
            Err(e) => {
                all_ok = false;
                println!("   ❌ oomadjust[{}]", e.title);
                for violation in &e.violations {
                    println!("      └─ {}", violation);
                }
            }
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_settings(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review the messages above");
        std::process::exit(1);
    }
}
