//! Remote configuration fetcher
//!
//! One connection per call: resolve credential, connect, verify host,
//! authenticate, read over SFTP, close. Host verification always precedes
//! authentication. The session is closed on every exit path.

use super::cancel::CancelToken;
use super::deadline::Deadline;
use super::descriptor::{ConnectionDescriptor, HostKeyPolicy, ResolvedCredential};
use super::errors::{FetchError, FetchStage};
use super::session::{SessionGuard, Transport};
use super::ssh::SshTransport;
use cce_parser::config::compile_time::document::MAX_DOCUMENT_BYTES;
use cce_parser::logging::codes;
use cce_parser::{log_error, log_success, log_warning, RawConfigurationDocument};
use std::sync::Arc;

/// A retrieved document plus what was learned about the host on the way
#[derive(Debug)]
pub struct FetchedDocument {
    pub document: RawConfigurationDocument,
    pub warnings: Vec<String>,
    pub host_key_fingerprint: Option<String>,
}

#[derive(Clone)]
pub struct RemoteConfigFetcher {
    transport: Arc<dyn Transport>,
    max_bytes: usize,
}

impl RemoteConfigFetcher {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(SshTransport::new()))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            max_bytes: MAX_DOCUMENT_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn fetch(
        &self,
        descriptor: &ConnectionDescriptor,
        remote_path: &str,
    ) -> Result<FetchedDocument, FetchError> {
        self.fetch_with_cancel(descriptor, remote_path, &CancelToken::new())
    }

    pub fn fetch_with_cancel(
        &self,
        descriptor: &ConnectionDescriptor,
        remote_path: &str,
        cancel: &CancelToken,
    ) -> Result<FetchedDocument, FetchError> {
        let result = self.fetch_inner(descriptor, remote_path, cancel);
        match &result {
            Ok(fetched) => log_success!(
                codes::success::FETCH_COMPLETE,
                "Configuration retrieved",
                "address" => descriptor.address(),
                "path" => remote_path,
                "bytes" => fetched.document.len()
            ),
            Err(err) => log_error!(
                err.error_code(),
                "Configuration fetch failed",
                "address" => descriptor.address(),
                "kind" => err.kind(),
                "error" => err
            ),
        }
        result
    }

    fn fetch_inner(
        &self,
        descriptor: &ConnectionDescriptor,
        remote_path: &str,
        cancel: &CancelToken,
    ) -> Result<FetchedDocument, FetchError> {
        validate_remote_path(remote_path)?;
        let credential = descriptor.credential.resolve()?;

        let deadline = Deadline::start(descriptor.timeout);
        cancel.check(FetchStage::Connect)?;

        let session = self
            .transport
            .open(descriptor, &deadline, cancel)
            .map_err(|e| {
                cancel.clear_abort();
                e
            })?;
        let mut guard = SessionGuard::new(session, cancel);
        let fingerprint = guard.fingerprint();
        let mut warnings = Vec::new();

        match descriptor.host_key_policy {
            HostKeyPolicy::Strict => {
                cancel.check(FetchStage::HostVerification)?;
                let known_hosts = descriptor.known_hosts_path();
                guard
                    .session()
                    .verify_host(&known_hosts, &descriptor.host, descriptor.port)?;
                log_success!(
                    codes::success::HOST_VERIFIED,
                    "Host key verified",
                    "host" => descriptor.host,
                    "fingerprint" => fingerprint.as_deref().unwrap_or("unknown")
                );
            }
            HostKeyPolicy::Disabled => {
                let warning = format!(
                    "host key verification disabled for {} (server key {})",
                    descriptor.address(),
                    fingerprint.as_deref().unwrap_or("unknown")
                );
                log_warning!(
                    code = codes::transport::HOST_KEY_CHECK_DISABLED,
                    "Host key verification disabled",
                    "address" => descriptor.address()
                );
                warnings.push(warning);
            }
        }

        cancel.check(FetchStage::Authentication)?;
        let credential_kind = match &credential {
            ResolvedCredential::KeyFile { .. } => "key-file",
            ResolvedCredential::Agent => "agent",
        };
        guard
            .session()
            .authenticate(&descriptor.username, &credential, &deadline)?;
        log_success!(
            codes::success::AUTHENTICATED,
            "Authenticated",
            "user" => descriptor.username,
            "method" => credential_kind
        );

        cancel.check(FetchStage::Transfer)?;
        let bytes = guard
            .session()
            .read_file(remote_path, self.max_bytes, &deadline, cancel)?;
        drop(guard);

        Ok(FetchedDocument {
            document: RawConfigurationDocument::from_source(bytes, remote_path),
            warnings,
            host_key_fingerprint: fingerprint,
        })
    }
}

impl Default for RemoteConfigFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute path without control characters or parent references
fn validate_remote_path(path: &str) -> Result<(), FetchError> {
    if !path.starts_with('/') {
        return Err(FetchError::transfer(path, "remote path must be absolute"));
    }
    if path.chars().any(|c| c.is_control()) {
        return Err(FetchError::transfer(
            path.escape_default().to_string().as_str(),
            "remote path contains control characters",
        ));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(FetchError::transfer(path, "remote path must not contain '..'"));
    }
    Ok(())
}
