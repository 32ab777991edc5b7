//! CLI arguments and subcommands for hive-metrics-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parses a config-file log level; unknown names map to `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "hive-metrics-exporter",
    about = "Prometheus exporter for cluster-wide Hive aggregate metrics",
    long_about = "Prometheus exporter for cluster-wide Hive aggregate metrics.\n\n\
                  Periodically lists ClusterDeployments and install Jobs and publishes \
                  aggregate counts (total, installed, install jobs) as Prometheus gauges.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (overrides config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Seconds to wait between calculation cycles
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Seconds before a single listing query is abandoned
    #[arg(long)]
    pub query_timeout: Option<u64>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub kube_context: Option<String>,

    /// Path to a YAML/JSON snapshot file (uses it instead of the cluster)
    #[arg(short = 's', long)]
    pub snapshot_file: Option<PathBuf>,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable internal hive_metrics_* telemetry
    #[arg(long)]
    pub disable_telemetry: bool,

    /// TLS certificate (PEM); requires --tls-key
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key (PEM); requires --tls-cert
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every tracked kind once and report what was found
    Check,

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run a single calculation cycle and print the resulting metrics
    Once,
}
