//! Remote configuration retrieval over SSH/SFTP

pub mod cancel;
pub mod deadline;
pub mod descriptor;
pub mod errors;
pub mod fetcher;
pub mod session;
pub mod ssh;

#[cfg(test)]
pub(crate) mod mock;

pub use cancel::CancelToken;
pub use deadline::Deadline;
pub use descriptor::{ConnectionDescriptor, HostKeyPolicy, KeyCredential, ResolvedCredential};
pub use errors::{FetchError, FetchStage};
pub use fetcher::{FetchedDocument, RemoteConfigFetcher};
pub use session::{SessionGuard, Transport, TransportSession};
pub use ssh::SshTransport;
