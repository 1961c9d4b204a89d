//! In-memory transport for tests. Records what the fetcher asked for.

use super::cancel::CancelToken;
use super::deadline::Deadline;
use super::descriptor::{ConnectionDescriptor, ResolvedCredential};
use super::errors::{FetchError, FetchStage};
use super::session::{Transport, TransportSession};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MOCK_FINGERPRINT: &str = "SHA256:bW9jay1ob3N0LWtleQ";

#[derive(Debug, Default)]
pub struct MockCounters {
    pub opens: AtomicUsize,
    pub auth_attempts: AtomicUsize,
    pub reads: AtomicUsize,
    pub closes: AtomicUsize,
    pub read_paths: Mutex<Vec<String>>,
}

impl MockCounters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn auth_attempts(&self) -> usize {
        self.auth_attempts.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct MockTransport {
    host_known: bool,
    accept_key: bool,
    open_error: Option<FetchError>,
    read_error: Option<FetchError>,
    block_on_read: bool,
    contents: Vec<u8>,
    pub counters: Arc<MockCounters>,
}

impl MockTransport {
    /// Known host, accepted key, serves `contents`
    pub fn serving(contents: &[u8]) -> Self {
        Self {
            host_known: true,
            accept_key: true,
            open_error: None,
            read_error: None,
            block_on_read: false,
            contents: contents.to_vec(),
            counters: Arc::new(MockCounters::default()),
        }
    }

    pub fn unknown_host(mut self) -> Self {
        self.host_known = false;
        self
    }

    pub fn rejecting_key(mut self) -> Self {
        self.accept_key = false;
        self
    }

    pub fn failing_open(mut self, error: FetchError) -> Self {
        self.open_error = Some(error);
        self
    }

    pub fn failing_read(mut self, error: FetchError) -> Self {
        self.read_error = Some(error);
        self
    }

    /// Reads block until cancelled or the deadline passes
    pub fn blocking_read(mut self) -> Self {
        self.block_on_read = true;
        self
    }
}

impl Transport for MockTransport {
    fn open(
        &self,
        _descriptor: &ConnectionDescriptor,
        _deadline: &Deadline,
        cancel: &CancelToken,
    ) -> Result<Box<dyn TransportSession>, FetchError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }

        let aborted = Arc::new(AtomicBool::new(false));
        let flag = aborted.clone();
        cancel.register_abort(move || flag.store(true, Ordering::SeqCst));

        Ok(Box::new(MockSession {
            transport: self.clone(),
            aborted,
        }))
    }
}

struct MockSession {
    transport: MockTransport,
    aborted: Arc<AtomicBool>,
}

impl TransportSession for MockSession {
    fn host_key_fingerprint(&self) -> Option<String> {
        Some(MOCK_FINGERPRINT.to_string())
    }

    fn verify_host(&mut self, _known_hosts: &Path, host: &str, _port: u16) -> Result<(), FetchError> {
        if self.transport.host_known {
            Ok(())
        } else {
            Err(FetchError::host_verification(host, "host is not in known_hosts"))
        }
    }

    fn authenticate(
        &mut self,
        _username: &str,
        _credential: &ResolvedCredential,
        _deadline: &Deadline,
    ) -> Result<(), FetchError> {
        self.transport
            .counters
            .auth_attempts
            .fetch_add(1, Ordering::SeqCst);
        if self.transport.accept_key {
            Ok(())
        } else {
            Err(FetchError::authentication("server did not accept the key"))
        }
    }

    fn read_file(
        &mut self,
        path: &str,
        max_bytes: usize,
        deadline: &Deadline,
        _cancel: &CancelToken,
    ) -> Result<Vec<u8>, FetchError> {
        self.transport.counters.reads.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut paths) = self.transport.counters.read_paths.lock() {
            paths.push(path.to_string());
        }

        if self.transport.block_on_read {
            loop {
                if self.aborted.load(Ordering::SeqCst) {
                    return Err(FetchError::Cancelled {
                        stage: FetchStage::Transfer,
                    });
                }
                if deadline.is_expired() {
                    return Err(deadline.timeout(FetchStage::Transfer));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        if let Some(error) = &self.transport.read_error {
            return Err(error.clone());
        }
        if self.transport.contents.len() > max_bytes {
            return Err(FetchError::transfer(path, "file exceeds limit"));
        }
        Ok(self.transport.contents.clone())
    }

    fn close(&mut self) -> Result<(), FetchError> {
        self.transport.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
