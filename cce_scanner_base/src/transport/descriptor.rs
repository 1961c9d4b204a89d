//! Connection descriptors and key credentials
//!
//! A descriptor is built by the caller and never changed once a run starts.
//! Credentials are key-based only; there is no password field.

use super::errors::FetchError;
use cce_parser::config::compile_time::transport::DEFAULT_SSH_PORT;
use cce_parser::config::runtime::{clamp_timeout, default_known_hosts_path};
use cce_parser::config::TransportPreferences;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKeyPolicy {
    #[default]
    Strict,
    /// Skips known_hosts verification; every use is reported as a warning
    Disabled,
}

impl HostKeyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Disabled => "disabled",
        }
    }
}

/// Reference to key material; resolved right before connecting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KeyCredential {
    File {
        private_key: PathBuf,
        #[serde(default)]
        public_key: Option<PathBuf>,
        /// Environment variable holding the key passphrase
        #[serde(default)]
        passphrase_env: Option<String>,
    },
    Agent,
}

impl KeyCredential {
    pub fn key_file(private_key: impl Into<PathBuf>) -> Self {
        Self::File {
            private_key: private_key.into(),
            public_key: None,
            passphrase_env: None,
        }
    }

    /// Load what the transport needs, or fail before any connection exists
    pub fn resolve(&self) -> Result<ResolvedCredential, FetchError> {
        match self {
            Self::File {
                private_key,
                public_key,
                passphrase_env,
            } => {
                let metadata = std::fs::metadata(private_key).map_err(|e| {
                    FetchError::authentication(format!(
                        "private key {} unusable: {}",
                        private_key.display(),
                        e
                    ))
                })?;
                if !metadata.is_file() || metadata.len() == 0 {
                    return Err(FetchError::authentication(format!(
                        "private key {} is empty or not a file",
                        private_key.display()
                    )));
                }
                if let Some(public_key) = public_key {
                    if !public_key.is_file() {
                        return Err(FetchError::authentication(format!(
                            "public key {} not found",
                            public_key.display()
                        )));
                    }
                }
                let passphrase = match passphrase_env {
                    Some(var) => Some(std::env::var(var).map_err(|_| {
                        FetchError::authentication(format!(
                            "passphrase variable {} is not set",
                            var
                        ))
                    })?),
                    None => None,
                };
                Ok(ResolvedCredential::KeyFile {
                    private_key: private_key.clone(),
                    public_key: public_key.clone(),
                    passphrase,
                })
            }
            Self::Agent => {
                if std::env::var_os("SSH_AUTH_SOCK").is_none() {
                    return Err(FetchError::authentication(
                        "SSH agent requested but SSH_AUTH_SOCK is not set",
                    ));
                }
                Ok(ResolvedCredential::Agent)
            }
        }
    }
}

/// Credential ready for use by a transport
#[derive(Clone, PartialEq, Eq)]
pub enum ResolvedCredential {
    KeyFile {
        private_key: PathBuf,
        public_key: Option<PathBuf>,
        passphrase: Option<String>,
    },
    Agent,
}

impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyFile {
                private_key,
                public_key,
                passphrase,
            } => f
                .debug_struct("KeyFile")
                .field("private_key", private_key)
                .field("public_key", public_key)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::Agent => f.write_str("Agent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub device_id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential: KeyCredential,
    pub timeout: Duration,
    pub host_key_policy: HostKeyPolicy,
    pub known_hosts: Option<PathBuf>,
}

impl ConnectionDescriptor {
    /// Strict host-key checking, port 22, default timeout
    pub fn new(device_id: &str, host: &str, username: &str, credential: KeyCredential) -> Self {
        let preferences = TransportPreferences::default();
        Self {
            device_id: device_id.to_string(),
            host: host.to_string(),
            port: DEFAULT_SSH_PORT,
            username: username.to_string(),
            credential,
            timeout: preferences.timeout(),
            host_key_policy: HostKeyPolicy::Strict,
            known_hosts: preferences.known_hosts_path,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Clamped to the supported timeout range
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = clamp_timeout(timeout);
        self
    }

    pub fn with_host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    pub fn with_known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts = Some(path.into());
        self
    }

    pub fn known_hosts_path(&self) -> PathBuf {
        self.known_hosts
            .clone()
            .unwrap_or_else(default_known_hosts_path)
    }

    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
