//! Configuration for the densefac runtime.
//!
//! Sources, highest precedence first:
//! 1. Environment variables (`DENSEFAC_KERNEL`, `DENSEFAC_LOG_LEVEL`, `DENSEFAC_LOG_STDERR`)
//! 2. The file named by `DENSEFAC_CONFIG`
//! 3. `.densefac.{yaml,yml,json,toml}` in the working directory
//! 4. `~/.config/densefac/config.{yaml,yml,json,toml}`
//! 5. Built-in defaults

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "DENSEFAC_CONFIG";
pub const KERNEL_ENV: &str = "DENSEFAC_KERNEL";
pub const LOG_LEVEL_ENV: &str = "DENSEFAC_LOG_LEVEL";
pub const LOG_STDERR_ENV: &str = "DENSEFAC_LOG_STDERR";

const CONFIG_EXTENSIONS: [&str; 4] = ["yaml", "yml", "json", "toml"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DensefacConfig {
    #[serde(default)]
    pub kernel: KernelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Which factorization kernel serves the builtins
    #[serde(default)]
    pub backend: BackendChoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    /// Mirror log output to stderr
    #[serde(default)]
    pub stderr: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// LAPACK when compiled in, otherwise the reference kernel
    #[default]
    Auto,
    Reference,
    Lapack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

impl BackendChoice {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(BackendChoice::Auto),
            "reference" | "ref" => Some(BackendChoice::Reference),
            "lapack" => Some(BackendChoice::Lapack),
            _ => None,
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            stderr: false,
        }
    }
}

/// Configuration loader with multiple source support
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<DensefacConfig> {
        let mut config = Self::load_from_files()?;
        Self::apply_overrides(&mut config, |key| env::var(key).ok());
        Ok(config)
    }

    fn load_from_files() -> Result<DensefacConfig> {
        for path in Self::find_config_files() {
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(&path);
            }
        }
        debug!("No configuration file found, using defaults");
        Ok(DensefacConfig::default())
    }

    /// Candidate configuration paths in precedence order.
    pub fn find_config_files() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(config_path) = env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(config_path));
        }

        if let Ok(current_dir) = env::current_dir() {
            for ext in CONFIG_EXTENSIONS {
                paths.push(current_dir.join(format!(".densefac.{ext}")));
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("densefac");
            for ext in CONFIG_EXTENSIONS {
                paths.push(config_dir.join(format!("config.{ext}")));
            }
        }

        paths
    }

    /// Load configuration from a specific file, choosing the format by extension.
    pub fn load_from_file(path: &Path) -> Result<DensefacConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            _ => {
                if let Ok(config) = serde_yaml::from_str(&content) {
                    config
                } else if let Ok(config) = serde_json::from_str(&content) {
                    config
                } else if let Ok(config) = toml::from_str(&content) {
                    config
                } else {
                    return Err(anyhow::anyhow!(
                        "Could not parse config file {} (tried YAML, JSON, TOML)",
                        path.display()
                    ));
                }
            }
        };

        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps an environment variable name to its value.
    /// Unparseable values are ignored.
    pub fn apply_overrides<F>(config: &mut DensefacConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup(KERNEL_ENV) {
            match BackendChoice::parse(&backend) {
                Some(choice) => config.kernel.backend = choice,
                None => debug!("Ignoring unknown {KERNEL_ENV} value '{backend}'"),
            }
        }

        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            if let Some(level) = LogLevel::parse(&level) {
                config.logging.level = level;
            }
        }

        if let Some(stderr) = lookup(LOG_STDERR_ENV) {
            if let Some(stderr) = parse_bool(&stderr) {
                config.logging.stderr = stderr;
            }
        }
    }

    /// Save configuration to a file
    pub fn save_to_file(config: &DensefacConfig, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(config)
                .context("Failed to serialize config to JSON")?,
            Some("toml") => {
                toml::to_string_pretty(config).context("Failed to serialize config to TOML")?
            }
            _ => serde_yaml::to_string(config).context("Failed to serialize config to YAML")?,
        };

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }
}

/// Parse a boolean value from string with various formats
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enable" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disable" | "disabled" => Some(false),
        "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = DensefacConfig::default();
        assert_eq!(config.kernel.backend, BackendChoice::Auto);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(!config.logging.stderr);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let parsed: DensefacConfig = serde_yaml::from_str("kernel:\n  backend: reference\n").unwrap();
        assert_eq!(parsed.kernel.backend, BackendChoice::Reference);
        assert_eq!(parsed.logging, LoggingConfig::default());
    }

    #[test]
    fn test_file_round_trip_per_format() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = DensefacConfig::default();
        config.kernel.backend = BackendChoice::Reference;
        config.logging.level = LogLevel::Trace;
        config.logging.stderr = true;

        for name in [".densefac.yaml", ".densefac.json", ".densefac.toml"] {
            let path = temp_dir.path().join(name);
            ConfigLoader::save_to_file(&config, &path).unwrap();
            let loaded = ConfigLoader::load_from_file(&path).unwrap();
            assert_eq!(loaded, config, "round trip through {name}");
        }
    }

    #[test]
    fn test_unparseable_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (KERNEL_ENV, "Reference"),
            (LOG_LEVEL_ENV, "debug"),
            (LOG_STDERR_ENV, "yes"),
        ]);
        let mut config = DensefacConfig::default();
        ConfigLoader::apply_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.kernel.backend, BackendChoice::Reference);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.stderr);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = DensefacConfig::default();
        ConfigLoader::apply_overrides(&mut config, |k| match k {
            KERNEL_ENV => Some("gpu".to_string()),
            LOG_LEVEL_ENV => Some("loud".to_string()),
            _ => None,
        });
        assert_eq!(config, DensefacConfig::default());
    }

    #[test]
    fn test_bool_parsing() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("invalid"), None);
    }
}
