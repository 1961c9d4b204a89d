//! # Scanner Errors
//!
//! Only construction and batch setup can fail. A run itself always yields a
//! [`RunResult`](crate::results::RunResult); fetch and parse failures are
//! carried inside it.

use crate::rules::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// Registry has no rules to evaluate
    #[error("Rule registry is empty")]
    EmptyRegistry,

    #[error("Configuration error: {reason}")]
    ConfigurationError { reason: String },

    #[error("Registry error: {0}")]
    RegistryError(#[from] RegistryError),

    /// A batch worker thread died outside rule isolation
    #[error("Batch worker failed: {reason}")]
    WorkerFailed { reason: String },
}

impl ScannerError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScannerError::ConfigurationError { .. })
    }

    pub fn user_message(&self) -> String {
        match self {
            ScannerError::EmptyRegistry => {
                "No compliance rules are registered; nothing to evaluate".to_string()
            }
            ScannerError::ConfigurationError { reason } => {
                format!("Scanner configuration error: {}", reason)
            }
            ScannerError::RegistryError(e) => format!("Rule registry error: {}", e),
            ScannerError::WorkerFailed { reason } => format!("Batch worker failed: {}", reason),
        }
    }
}
