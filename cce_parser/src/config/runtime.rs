// RUNTIME PREFERENCES (operator supplied, clamped to compile-time bounds)

use super::constants::compile_time::transport::*;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    pub fn to_events_log_level(self) -> crate::logging::LogLevel {
        match self {
            LogLevel::Error => crate::logging::LogLevel::Error,
            LogLevel::Warning => crate::logging::LogLevel::Warning,
            LogLevel::Info => crate::logging::LogLevel::Info,
            LogLevel::Debug => crate::logging::LogLevel::Debug,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warning),
            "info" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingPreferences {
    /// Minimum level forwarded to the log backend
    pub min_log_level: LogLevel,

    /// Emit events as JSON lines instead of text
    pub use_structured_logging: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            min_log_level: env::var("CCE_LOG_LEVEL")
                .ok()
                .and_then(|v| LogLevel::parse(&v))
                .unwrap_or(LogLevel::Info),
            use_structured_logging: env::var("CCE_STRUCTURED_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportPreferences {
    /// Budget for the whole connect + authenticate + read sequence
    pub timeout_secs: u64,

    /// Verify host keys against known_hosts (false is the insecure escape hatch)
    pub host_key_check: bool,

    /// Explicit known_hosts location; defaults to ~/.ssh/known_hosts
    pub known_hosts_path: Option<PathBuf>,

    /// Configuration file fetched when the caller gives no path
    pub remote_config_path: String,
}

impl Default for TransportPreferences {
    fn default() -> Self {
        Self {
            timeout_secs: env::var("CCE_SSH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            host_key_check: env::var("CCE_HOST_KEY_CHECK")
                .ok()
                .and_then(|v| v.to_ascii_lowercase().parse().ok())
                .unwrap_or(true),
            known_hosts_path: env::var_os("CCE_KNOWN_HOSTS").map(PathBuf::from),
            remote_config_path: env::var("CCE_REMOTE_CONFIG_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REMOTE_CONFIG_PATH.to_string()),
        }
    }
}

impl TransportPreferences {
    /// Timeout clamped to the compile-time bounds
    pub fn timeout(&self) -> Duration {
        clamp_timeout(Duration::from_secs(self.timeout_secs))
    }

    pub fn known_hosts_path(&self) -> PathBuf {
        self.known_hosts_path
            .clone()
            .unwrap_or_else(default_known_hosts_path)
    }
}

pub fn clamp_timeout(timeout: Duration) -> Duration {
    timeout.clamp(
        Duration::from_secs(MIN_TIMEOUT_SECS),
        Duration::from_secs(MAX_TIMEOUT_SECS),
    )
}

pub fn default_known_hosts_path() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_KNOWN_HOSTS_RELATIVE)
}
