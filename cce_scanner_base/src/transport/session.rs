//! Transport seams
//!
//! [`Transport`] opens one connection; [`TransportSession`] drives host
//! verification, authentication and the file read on it. [`SessionGuard`]
//! owns an open session and closes it on every exit path.

use super::cancel::CancelToken;
use super::deadline::Deadline;
use super::descriptor::{ConnectionDescriptor, ResolvedCredential};
use super::errors::FetchError;
use cce_parser::logging::codes;
use cce_parser::log_warning;
use std::path::Path;

pub trait Transport: Send + Sync {
    /// Open a connection and complete the protocol handshake
    fn open(
        &self,
        descriptor: &ConnectionDescriptor,
        deadline: &Deadline,
        cancel: &CancelToken,
    ) -> Result<Box<dyn TransportSession>, FetchError>;
}

pub trait TransportSession {
    /// `SHA256:<base64>` of the server host key, once the handshake is done
    fn host_key_fingerprint(&self) -> Option<String>;

    /// Check the server key against a known_hosts file; only an exact match passes
    fn verify_host(&mut self, known_hosts: &Path, host: &str, port: u16) -> Result<(), FetchError>;

    fn authenticate(
        &mut self,
        username: &str,
        credential: &ResolvedCredential,
        deadline: &Deadline,
    ) -> Result<(), FetchError>;

    /// Read a whole file over the file-transfer channel; short reads are errors
    fn read_file(
        &mut self,
        path: &str,
        max_bytes: usize,
        deadline: &Deadline,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, FetchError>;

    fn close(&mut self) -> Result<(), FetchError>;
}

pub struct SessionGuard<'a> {
    session: Box<dyn TransportSession>,
    cancel: &'a CancelToken,
}

impl<'a> SessionGuard<'a> {
    pub fn new(session: Box<dyn TransportSession>, cancel: &'a CancelToken) -> Self {
        Self { session, cancel }
    }

    pub fn session(&mut self) -> &mut dyn TransportSession {
        self.session.as_mut()
    }

    pub fn fingerprint(&self) -> Option<String> {
        self.session.host_key_fingerprint()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.session.close() {
            log_warning!(
                code = codes::transport::TEARDOWN_INCOMPLETE,
                "Transport teardown incomplete",
                "error" => e
            );
        }
        self.cancel.clear_abort();
    }
}
