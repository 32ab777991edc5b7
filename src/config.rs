//! Configuration management for hive-metrics-exporter.
//!
//! Configuration is loaded from YAML, JSON or TOML (chosen by extension)
//! and merged with CLI overrides. Precedence: CLI > config file > default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9216;
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Locations searched when no config file is given explicitly.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/hive/metrics-exporter.yaml",
    "/etc/hive/metrics-exporter.yml",
    "/etc/hive/metrics-exporter.json",
    "./hive-metrics-exporter.yaml",
    "./hive-metrics-exporter.yml",
    "./hive-metrics-exporter.json",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Calculation loop
    #[serde(alias = "interval")]
    pub interval_secs: Option<u64>,
    #[serde(alias = "query-timeout-secs")]
    pub query_timeout_secs: Option<u64>,

    // Listing backend
    /// Serve listings from a snapshot file instead of the cluster
    #[serde(alias = "snapshot-file")]
    pub snapshot_file: Option<PathBuf>,
    /// Kubeconfig context to use; ambient default when unset
    #[serde(alias = "kube-context")]
    pub kube_context: Option<String>,

    // Feature flags
    pub enable_health: Option<bool>,
    pub enable_telemetry: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            interval_secs: Some(DEFAULT_INTERVAL_SECS),
            query_timeout_secs: Some(DEFAULT_QUERY_TIMEOUT_SECS),
            snapshot_file: None,
            kube_context: None,
            enable_health: Some(true),
            enable_telemetry: Some(true),
            log_level: Some("info".to_string()),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(
            self.query_timeout_secs
                .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS),
        )
    }

    pub fn bind_addr(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls_cert_path.is_some() && self.tls_key_path.is_some()
    }
}

/// Validates the merged configuration.
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.interval_secs == Some(0) {
        return Err(ConfigError::Invalid(
            "interval_secs must be greater than 0".into(),
        ));
    }
    if cfg.query_timeout_secs == Some(0) {
        return Err(ConfigError::Invalid(
            "query_timeout_secs must be greater than 0".into(),
        ));
    }
    if cfg.port == Some(0) {
        return Err(ConfigError::Invalid("port must be greater than 0".into()));
    }
    if let Some(bind) = &cfg.bind {
        if bind.parse::<std::net::IpAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "bind address '{bind}' is not a valid IP address"
            )));
        }
    }
    if let Some(level) = &cfg.log_level {
        const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];
        if !LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!("unknown log_level '{level}'")));
        }
    }
    if cfg.tls_cert_path.is_some() != cfg.tls_key_path.is_some() {
        return Err(ConfigError::Invalid(
            "tls_cert_path and tls_key_path must be set together".into(),
        ));
    }
    if let Some(path) = &cfg.snapshot_file {
        if !path.exists() {
            return Err(ConfigError::Invalid(format!(
                "snapshot file {} does not exist",
                path.display()
            )));
        }
    }
    Ok(())
}

/// The file `load_config` reads: `path` when given, else the first existing
/// default location.
pub fn config_path(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(p) => Some(p.to_path_buf()),
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists()),
    }
}

/// Loads configuration from `path`, or the first existing default location.
/// Returns the built-in defaults when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = config_path(path) else {
        return Ok(Config::default());
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let parse_err = |message: String| ConfigError::Parse {
        path: path.display().to_string(),
        message,
    };

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        validate_effective_config(&cfg).unwrap();
        assert_eq!(cfg.interval(), Duration::from_secs(60));
        assert_eq!(cfg.query_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.port(), DEFAULT_PORT);
        assert!(!cfg.tls_enabled());
    }

    #[test]
    fn zero_interval_rejected() {
        let cfg = Config {
            interval_secs: Some(0),
            ..Config::default()
        };
        assert!(matches!(
            validate_effective_config(&cfg),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_query_timeout_rejected() {
        let cfg = Config {
            query_timeout_secs: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn half_tls_config_rejected() {
        let cfg = Config {
            tls_cert_path: Some(PathBuf::from("/tmp/cert.pem")),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn bad_bind_and_log_level_rejected() {
        let cfg = Config {
            bind: Some("not-an-ip".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            log_level: Some("loud".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn missing_snapshot_file_rejected() {
        let cfg = Config {
            snapshot_file: Some(PathBuf::from("/nonexistent/snapshot.yaml")),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn load_yaml_keeps_defaults_for_missing_fields() {
        let file = write_config(".yaml", "interval_secs: 15\nport: 9999\n");
        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.interval_secs, Some(15));
        assert_eq!(cfg.port, Some(9999));
        assert_eq!(cfg.query_timeout_secs, Some(DEFAULT_QUERY_TIMEOUT_SECS));
        assert_eq!(cfg.bind.as_deref(), Some(DEFAULT_BIND_ADDR));
    }

    #[test]
    fn load_json_and_toml() {
        let json = write_config(".json", r#"{"interval_secs": 5, "enable_health": false}"#);
        let cfg = load_config(Some(json.path())).unwrap();
        assert_eq!(cfg.interval_secs, Some(5));
        assert_eq!(cfg.enable_health, Some(false));

        let toml = write_config(".toml", "query_timeout_secs = 7\nkube_context = \"admin\"\n");
        let cfg = load_config(Some(toml.path())).unwrap();
        assert_eq!(cfg.query_timeout_secs, Some(7));
        assert_eq!(cfg.kube_context.as_deref(), Some("admin"));
    }

    #[test]
    fn aliases_accepted() {
        let file = write_config(".yaml", "interval: 20\nsnapshot-file: /tmp/x.yaml\n");
        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.interval_secs, Some(20));
        assert_eq!(cfg.snapshot_file, Some(PathBuf::from("/tmp/x.yaml")));
    }

    #[test]
    fn unreadable_and_malformed_files() {
        let err = load_config(Some(Path::new("/nonexistent/config.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let file = write_config(".json", "{ not json");
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn explicit_path_is_the_config_source() {
        let file = write_config(".yaml", "port: 9300\n");
        assert_eq!(config_path(Some(file.path())), Some(file.path().to_path_buf()));
        assert_eq!(load_config(Some(file.path())).unwrap().port(), 9300);
    }
}
