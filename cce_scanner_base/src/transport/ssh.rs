//! SSH/SFTP transport over libssh2
//!
//! One TCP connection per fetch. The remote file is read over SFTP; no
//! remote command is ever executed.

use super::cancel::CancelToken;
use super::deadline::Deadline;
use super::descriptor::{ConnectionDescriptor, ResolvedCredential};
use super::errors::{FetchError, FetchStage};
use super::session::{Transport, TransportSession};
use base64::Engine;
use cce_parser::config::compile_time::transport::SFTP_READ_CHUNK_BYTES;
use cce_parser::logging::codes;
use cce_parser::{log_debug, log_success};
use ssh2::{CheckResult, ErrorCode, HashType, KnownHostFileKind, Session};
use std::io::{ErrorKind, Read};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// libssh2 LIBSSH2_ERROR_TIMEOUT
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;

/// How often a pending name lookup rechecks the cancel token
const RESOLVE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Default, Clone, Copy)]
pub struct SshTransport;

impl SshTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for SshTransport {
    fn open(
        &self,
        descriptor: &ConnectionDescriptor,
        deadline: &Deadline,
        cancel: &CancelToken,
    ) -> Result<Box<dyn TransportSession>, FetchError> {
        let stream = connect(descriptor, deadline, cancel)?;

        let abort_handle = stream
            .try_clone()
            .map_err(|e| FetchError::connection(&descriptor.host, e.to_string()))?;
        cancel.register_abort(move || {
            let _ = abort_handle.shutdown(Shutdown::Both);
        });

        let shutdown_handle = stream
            .try_clone()
            .map_err(|e| FetchError::connection(&descriptor.host, e.to_string()))?;

        let mut session =
            Session::new().map_err(|e| FetchError::connection(&descriptor.host, e.message()))?;
        session.set_tcp_stream(stream);

        let mut ssh = SshSession {
            session,
            stream: shutdown_handle,
            host: descriptor.host.clone(),
            cancel: cancel.clone(),
        };

        ssh.apply_timeout(deadline, FetchStage::Handshake)?;
        ssh.session
            .handshake()
            .map_err(|e| ssh.classify(e, FetchStage::Handshake, deadline))?;

        log_success!(
            codes::success::SESSION_ESTABLISHED,
            "SSH session established",
            "address" => descriptor.address()
        );
        Ok(Box::new(ssh))
    }
}

fn connect(
    descriptor: &ConnectionDescriptor,
    deadline: &Deadline,
    cancel: &CancelToken,
) -> Result<TcpStream, FetchError> {
    let addresses = resolve(&descriptor.host, descriptor.port, deadline, cancel)?;

    let mut last_error = None;
    for address in addresses {
        cancel.check(FetchStage::Connect)?;
        let remaining = deadline.remaining(FetchStage::Connect)?;
        log_debug!("Connecting", "address" => address);
        match TcpStream::connect_timeout(&address, remaining) {
            Ok(stream) => return Ok(stream),
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                return Err(deadline.timeout(FetchStage::Connect));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(FetchError::connection(
        &descriptor.host,
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no addresses resolved".to_string()),
    ))
}

/// Name lookup bounded by the deadline and the cancel token. getaddrinfo
/// cannot be interrupted, so it runs on a detached helper thread that is
/// abandoned when the wait ends early.
fn resolve(
    host: &str,
    port: u16,
    deadline: &Deadline,
    cancel: &CancelToken,
) -> Result<Vec<SocketAddr>, FetchError> {
    cancel.check(FetchStage::Connect)?;
    deadline.remaining(FetchStage::Connect)?;

    let (sender, receiver) = mpsc::channel();
    let target = (host.to_string(), port);
    thread::Builder::new()
        .name("cce-resolve".to_string())
        .spawn(move || {
            let lookup = (target.0.as_str(), target.1)
                .to_socket_addrs()
                .map(|addresses| addresses.collect::<Vec<_>>());
            let _ = sender.send(lookup);
        })
        .map_err(|e| FetchError::connection(host, format!("cannot start resolver: {}", e)))?;

    loop {
        cancel.check(FetchStage::Connect)?;
        let wait = deadline.remaining(FetchStage::Connect)?.min(RESOLVE_POLL);
        match receiver.recv_timeout(wait) {
            Ok(Ok(addresses)) => return Ok(addresses),
            Ok(Err(e)) => {
                return Err(FetchError::connection(host, format!("cannot resolve: {}", e)))
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(FetchError::connection(host, "resolver exited without an answer"))
            }
        }
    }
}

/// Cancellation and deadline expiry win over whatever libssh2 reported
fn interruption(
    err: &ssh2::Error,
    stage: FetchStage,
    deadline: &Deadline,
    cancel: &CancelToken,
) -> Option<FetchError> {
    if cancel.is_cancelled() {
        return Some(FetchError::Cancelled { stage });
    }
    if matches!(err.code(), ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT)) || deadline.is_expired() {
        return Some(deadline.timeout(stage));
    }
    None
}

/// SFTP failure on `path`
fn transfer_error(
    err: ssh2::Error,
    path: &str,
    deadline: &Deadline,
    cancel: &CancelToken,
) -> FetchError {
    interruption(&err, FetchStage::Transfer, deadline, cancel)
        .unwrap_or_else(|| FetchError::transfer(path, err.message()))
}

struct SshSession {
    session: Session,
    stream: TcpStream,
    host: String,
    cancel: CancelToken,
}

impl SshSession {
    /// Bound the next blocking libssh2 call by what is left of the deadline
    fn apply_timeout(&self, deadline: &Deadline, stage: FetchStage) -> Result<(), FetchError> {
        let remaining = deadline.remaining(stage)?;
        let millis = remaining.as_millis().clamp(1, u32::MAX as u128) as u32;
        self.session.set_timeout(millis);
        Ok(())
    }

    fn classify(&self, err: ssh2::Error, stage: FetchStage, deadline: &Deadline) -> FetchError {
        if let Some(interrupted) = interruption(&err, stage, deadline, &self.cancel) {
            return interrupted;
        }
        match stage {
            FetchStage::Authentication => FetchError::authentication(err.message()),
            FetchStage::HostVerification => FetchError::host_verification(&self.host, err.message()),
            FetchStage::Connect | FetchStage::Handshake => {
                FetchError::connection(&self.host, err.message())
            }
            FetchStage::Transfer => FetchError::transfer("sftp channel", err.message()),
        }
    }

    fn classify_io(
        &self,
        err: std::io::Error,
        path: &str,
        deadline: &Deadline,
    ) -> FetchError {
        if self.cancel.is_cancelled() {
            return FetchError::Cancelled {
                stage: FetchStage::Transfer,
            };
        }
        if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) || deadline.is_expired() {
            return deadline.timeout(FetchStage::Transfer);
        }
        FetchError::transfer(path, err.to_string())
    }
}

impl TransportSession for SshSession {
    fn host_key_fingerprint(&self) -> Option<String> {
        self.session
            .host_key_hash(HashType::Sha256)
            .map(|hash| format!("SHA256:{}", base64::engine::general_purpose::STANDARD_NO_PAD.encode(hash)))
    }

    fn verify_host(&mut self, known_hosts: &Path, host: &str, port: u16) -> Result<(), FetchError> {
        let (key, _) = self
            .session
            .host_key()
            .ok_or_else(|| FetchError::host_verification(host, "server presented no host key"))?;

        let mut store = self
            .session
            .known_hosts()
            .map_err(|e| FetchError::host_verification(host, e.message()))?;
        store
            .read_file(known_hosts, KnownHostFileKind::OpenSSH)
            .map_err(|e| {
                FetchError::host_verification(
                    host,
                    format!("cannot read {}: {}", known_hosts.display(), e.message()),
                )
            })?;

        match store.check_port(host, port, key) {
            CheckResult::Match => Ok(()),
            CheckResult::Mismatch => Err(FetchError::host_verification(
                host,
                "host key does not match known_hosts entry",
            )),
            CheckResult::NotFound => Err(FetchError::host_verification(
                host,
                "host is not in known_hosts",
            )),
            CheckResult::Failure => Err(FetchError::host_verification(
                host,
                "known_hosts check failed",
            )),
        }
    }

    fn authenticate(
        &mut self,
        username: &str,
        credential: &ResolvedCredential,
        deadline: &Deadline,
    ) -> Result<(), FetchError> {
        self.apply_timeout(deadline, FetchStage::Authentication)?;
        let result = match credential {
            ResolvedCredential::KeyFile {
                private_key,
                public_key,
                passphrase,
            } => self.session.userauth_pubkey_file(
                username,
                public_key.as_deref(),
                private_key,
                passphrase.as_deref(),
            ),
            ResolvedCredential::Agent => self.session.userauth_agent(username),
        };
        result.map_err(|e| self.classify(e, FetchStage::Authentication, deadline))?;

        if !self.session.authenticated() {
            return Err(FetchError::authentication("server did not accept the key"));
        }
        Ok(())
    }

    fn read_file(
        &mut self,
        path: &str,
        max_bytes: usize,
        deadline: &Deadline,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, FetchError> {
        self.apply_timeout(deadline, FetchStage::Transfer)?;
        let sftp = self
            .session
            .sftp()
            .map_err(|e| self.classify(e, FetchStage::Transfer, deadline))?;

        let remote = Path::new(path);
        let expected = sftp
            .stat(remote)
            .map_err(|e| transfer_error(e, path, deadline, cancel))?
            .size;
        if let Some(size) = expected {
            if size > max_bytes as u64 {
                return Err(FetchError::transfer(
                    path,
                    format!("file is {} bytes, limit is {}", size, max_bytes),
                ));
            }
        }

        let mut file = sftp
            .open(remote)
            .map_err(|e| transfer_error(e, path, deadline, cancel))?;
        let mut contents = Vec::with_capacity(expected.unwrap_or(0) as usize);
        let mut chunk = vec![0u8; SFTP_READ_CHUNK_BYTES];
        loop {
            cancel.check(FetchStage::Transfer)?;
            self.apply_timeout(deadline, FetchStage::Transfer)?;
            let n = file
                .read(&mut chunk)
                .map_err(|e| self.classify_io(e, path, deadline))?;
            if n == 0 {
                break;
            }
            if contents.len() + n > max_bytes {
                return Err(FetchError::transfer(
                    path,
                    format!("file exceeds {} bytes", max_bytes),
                ));
            }
            contents.extend_from_slice(&chunk[..n]);
        }

        if let Some(size) = expected {
            if contents.len() as u64 != size {
                return Err(FetchError::transfer(
                    path,
                    format!("short read: {} of {} bytes", contents.len(), size),
                ));
            }
        }
        Ok(contents)
    }

    fn close(&mut self) -> Result<(), FetchError> {
        self.session.set_timeout(Duration::from_secs(2).as_millis() as u32);
        let disconnect = self.session.disconnect(None, "fetch complete", None);
        let _ = self.stream.shutdown(Shutdown::Both);
        disconnect.map_err(|e| FetchError::connection(&self.host, e.message()))
    }
}
