//! # Scanner Configuration

use cce_parser::config::runtime::TransportPreferences;
use cce_parser::ParseOptions;

/// Configuration for the [`ComplianceScanner`](super::ComplianceScanner)
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Identifies this scanner instance in log events
    pub scanner_id: String,

    /// Caps applied to every fetched document; `max_bytes` also bounds the transfer
    pub parse_options: ParseOptions,

    /// Remote file used by `run_default`
    pub default_remote_path: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scanner_id: "cce-scanner".to_string(),
            parse_options: ParseOptions::default(),
            default_remote_path: TransportPreferences::default().remote_config_path,
        }
    }
}

impl ScannerConfig {
    pub fn new(scanner_id: impl Into<String>) -> Self {
        Self {
            scanner_id: scanner_id.into(),
            ..Self::default()
        }
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    pub fn with_default_remote_path(mut self, path: impl Into<String>) -> Self {
        self.default_remote_path = path.into();
        self
    }

    /// Reject settings the scanner cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.scanner_id.trim().is_empty() {
            return Err("scanner id must not be empty".to_string());
        }
        if !self.default_remote_path.starts_with('/') {
            return Err(format!(
                "default remote path '{}' must be absolute",
                self.default_remote_path.escape_default()
            ));
        }
        if self.parse_options.max_bytes == 0 || self.parse_options.max_nodes == 0 {
            return Err("parse limits must be non-zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cce_parser::config::compile_time::transport::DEFAULT_REMOTE_CONFIG_PATH;

    #[test]
    fn test_default_config() {
        std::env::remove_var("CCE_REMOTE_CONFIG_PATH");
        let config = ScannerConfig::default();
        assert_eq!(config.scanner_id, "cce-scanner");
        assert_eq!(config.default_remote_path, DEFAULT_REMOTE_CONFIG_PATH);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ScannerConfig::new("audit-01")
            .with_parse_options(ParseOptions::default().with_max_depth(16))
            .with_default_remote_path("/cf/conf/config.xml");

        assert_eq!(config.scanner_id, "audit-01");
        assert_eq!(config.parse_options.max_depth, 16);
        assert_eq!(config.default_remote_path, "/cf/conf/config.xml");
    }

    #[test]
    fn test_validation() {
        assert!(ScannerConfig::new(" ").validate().is_err());
        assert!(ScannerConfig::new("x")
            .with_default_remote_path("conf/config.xml")
            .validate()
            .is_err());
        assert!(ScannerConfig::new("x")
            .with_parse_options(ParseOptions::default().with_max_bytes(0))
            .validate()
            .is_err());
    }
}
