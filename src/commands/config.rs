//! Config command implementation.
//!
//! Generates example manifests in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates an example manifest.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::example();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("oomadjust.yaml"),
    };

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Manifest written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to a YAML manifest.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# oomadjust Manifest
# ==================
#
# Global Settings
# ---------------
# log_level: "info"            # off, error, warn, info, debug, trace
# proc_root: "/proc"           # Location of the proc filesystem
# noop: false                  # Report changes without writing
#
# Resources
# ---------
# resources:
#   - title: rsyslogd          # Process name unless `name` is set
#     name: rsyslogd           # [a-zA-Z0-9_-]+
#     pidfile: /var/run/rsyslogd.pid  # Absolute, must exist
#     legacy: false            # true: oom_adj (-17..15), false: oom_score_adj (-1000..1000)
#                              # Default: false if /proc/self/oom_score_adj exists
#     adjustment: "-1000"      # Default: -1000 with oom_score_adj on the host, else -17
#                              # 0 is not accepted
#     ensure: present          # present or absent (absent leaves the value alone)
"#;

    format!("{comments}\n{yaml}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generated_manifest_loads_back() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("oomadjust.yaml");

        command_config(Some(path.clone()), ConfigFormat::Yaml, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# oomadjust Manifest"));

        let cfg = crate::config::load_config(Some(&path)).unwrap();
        assert_eq!(cfg.resources.len(), 3);
        assert_eq!(cfg.resources[2].name.as_deref(), Some("nginx"));
    }
}
