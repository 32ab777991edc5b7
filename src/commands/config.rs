//! Config command implementation.
//!
//! Generates a default configuration file in YAML, JSON or TOML.

use hive_metrics_exporter::Config;
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;

/// Generates configuration files
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let content = render_config(&Config::default(), &format, commented)?;

    match output {
        Some(path) if path.to_string_lossy() != "-" => {
            fs::write(&path, content)?;
            println!("Configuration written to: {}", path.display());
        }
        _ => print!("{content}"),
    }

    Ok(())
}

/// Serializes a configuration; comments are only added to YAML.
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
    commented: bool,
) -> anyhow::Result<String> {
    let content = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => {
            let content = serde_yaml::to_string(config)?;
            if commented {
                add_config_comments(content)
            } else {
                content
            }
        }
    };
    Ok(content)
}

/// Adds comments to YAML configuration
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Hive Metrics Exporter Configuration
# ===================================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 9216                   # HTTP port
#
# Calculation Loop
# ----------------
# interval_secs: 60            # Seconds to wait between cycles (> 0)
# query_timeout_secs: 30       # Abandon a single listing after N seconds (> 0)
#
# Listing Backend
# ---------------
# snapshot_file: null          # YAML/JSON snapshot instead of the cluster
# kube_context: null           # Kubeconfig context (null = ambient config)
#
# Feature Flags
# -------------
# enable_health: true          # Enable /health endpoint
# enable_telemetry: true       # Export hive_metrics_* self metrics
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
#
# TLS
# ---
# tls_cert_path: null          # PEM certificate, requires tls_key_path
# tls_key_path: null           # PEM private key, requires tls_cert_path
"#;

    format!("{comments}\n{yaml}")
}
