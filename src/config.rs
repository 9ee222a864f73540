use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatch::DispatchConfig;

/// Main hookpost configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub notifications: NotificationsConfig,
    pub rules: Vec<RuleConfig>,
    pub audit: AuditConfig,
}

/// Log verbosity, overridden by RUST_LOG
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" => Some(LogLevel::Off),
            _ => None,
        }
    }
}

/// Module-wide notification settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Master switch, checked by `send` before dispatching
    pub enabled: bool,
    /// Accept self-signed or mismatched certificates. Never on by default.
    pub insecure_skip_verify: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// A notification rule and where it delivers
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuleConfig {
    pub name: String,
    pub endpoint: Option<String>,
}

/// Audit sink type
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    /// Write through the application log
    Log,
    /// Append to JSONL files under `audit.path`
    File,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    pub sinks: Vec<AuditSinkKind>,
    pub path: PathBuf,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            insecure_skip_verify: false,
            timeout_secs: 15,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("hookpost");

        Self {
            sinks: vec![AuditSinkKind::Log, AuditSinkKind::File],
            path: data_dir.join("audit"),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("HOOKPOST_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from HOOKPOST_CONFIG: {}", e);
                    }
                }
            }
        }

        if let Ok(dir) = std::env::var("HOOKPOST_DIR") {
            let path = PathBuf::from(dir).join("hookpost.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from HOOKPOST_DIR: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/hookpost/hookpost.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("hookpost").join("hookpost.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./hookpost.yaml (for development)
        let local_config = PathBuf::from("hookpost.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject settings that would make every delivery fail
    pub fn validate(&self) -> Result<()> {
        if self.notifications.timeout_secs == 0 {
            eyre::bail!("notifications.timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Directory holding hookpost.yaml
    pub fn hookpost_dir() -> PathBuf {
        std::env::var("HOOKPOST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("hookpost"))
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }

    /// Dispatch settings for one endpoint, using the module-wide transport options
    pub fn dispatch_config(&self, endpoint: Option<&str>) -> DispatchConfig {
        DispatchConfig {
            endpoint: endpoint.map(str::to_string),
            enabled: self.notifications.enabled,
            insecure_skip_verify: self.notifications.insecure_skip_verify,
            timeout: Duration::from_secs(self.notifications.timeout_secs),
        }
    }

    pub fn find_rule(&self, name: &str) -> Option<&RuleConfig> {
        self.rules.iter().find(|r| r.name == name)
    }
}
