//! Fetch-phase errors

use cce_parser::logging::{codes, Code};
use serde::Serialize;
use std::fmt;

/// Point in the fetch sequence where a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStage {
    Connect,
    Handshake,
    HostVerification,
    Authentication,
    Transfer,
}

impl FetchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Handshake => "handshake",
            Self::HostVerification => "host-verification",
            Self::Authentication => "authentication",
            Self::Transfer => "transfer",
        }
    }
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Host verification failed for {host}: {reason}")]
    HostVerificationFailed { host: String, reason: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Connection to {host} failed: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Timed out during {stage} after {elapsed_ms} ms")]
    Timeout { stage: FetchStage, elapsed_ms: u64 },

    #[error("Transfer of {path} failed: {reason}")]
    TransferFailed { path: String, reason: String },

    #[error("Cancelled during {stage}")]
    Cancelled { stage: FetchStage },
}

impl FetchError {
    pub fn host_verification(host: &str, reason: impl Into<String>) -> Self {
        Self::HostVerificationFailed {
            host: host.to_string(),
            reason: reason.into(),
        }
    }

    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            reason: reason.into(),
        }
    }

    pub fn connection(host: &str, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            host: host.to_string(),
            reason: reason.into(),
        }
    }

    pub fn transfer(path: &str, reason: impl Into<String>) -> Self {
        Self::TransferFailed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable kind string used in run results
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HostVerificationFailed { .. } => "host-verification-failed",
            Self::AuthenticationFailed { .. } => "authentication-failed",
            Self::ConnectionFailed { .. } => "connection-failed",
            Self::Timeout { .. } => "timeout",
            Self::TransferFailed { .. } => "transfer-failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Only timeouts are worth retrying without operator action
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::HostVerificationFailed { .. } => codes::transport::HOST_VERIFICATION_FAILED,
            Self::AuthenticationFailed { .. } => codes::transport::AUTHENTICATION_FAILED,
            Self::ConnectionFailed { .. } => codes::transport::CONNECTION_FAILED,
            Self::Timeout { .. } => codes::transport::TIMEOUT,
            Self::TransferFailed { .. } => codes::transport::TRANSFER_FAILED,
            Self::Cancelled { .. } => codes::transport::CANCELLED,
        }
    }

    /// Operator-facing message
    pub fn user_message(&self) -> String {
        match self {
            Self::HostVerificationFailed { .. } => format!(
                "{}. Confirm the device identity and add its key to known_hosts.",
                self
            ),
            Self::AuthenticationFailed { .. } => {
                format!("{}. Check the username and key credential.", self)
            }
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => {
                format!("{}. Check connectivity to the device.", self)
            }
            Self::TransferFailed { .. } | Self::Cancelled { .. } => self.to_string(),
        }
    }
}
