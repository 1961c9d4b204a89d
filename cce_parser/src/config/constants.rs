pub mod compile_time {
    pub mod document {
        /// Maximum configuration document size accepted for parsing (16MB)
        /// SECURITY: Bounds memory spent on a single untrusted document
        pub const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

        /// Maximum element nesting depth
        /// SECURITY: Prevents stack exhaustion via deeply nested documents
        pub const MAX_NESTING_DEPTH: usize = 64;

        /// Maximum number of nodes (elements, text, attributes) per document
        /// SECURITY: Caps tree size independently of byte size
        pub const MAX_NODE_COUNT: u32 = 1_000_000;

        /// Root element of an appliance configuration document
        pub const EXPECTED_ROOT_ELEMENT: &str = "pfsense";
    }

    pub mod transport {
        /// Default SSH port
        pub const DEFAULT_SSH_PORT: u16 = 22;

        /// Default budget for connect + authenticate + read
        pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

        /// Lower bound for a caller supplied timeout
        pub const MIN_TIMEOUT_SECS: u64 = 1;

        /// Upper bound for a caller supplied timeout
        /// RESOURCE: One unreachable device cannot stall a batch for long
        pub const MAX_TIMEOUT_SECS: u64 = 600;

        /// Configuration file location on the appliance
        pub const DEFAULT_REMOTE_CONFIG_PATH: &str = "/conf/config.xml";

        /// SFTP read buffer size
        pub const SFTP_READ_CHUNK_BYTES: usize = 64 * 1024;

        /// Known-hosts file relative to the home directory
        pub const DEFAULT_KNOWN_HOSTS_RELATIVE: &str = ".ssh/known_hosts";
    }

    pub mod evidence {
        /// Maximum length of a verdict evidence string, in characters
        /// SECURITY: Keeps reports bounded when a document carries huge values
        pub const MAX_EVIDENCE_CHARS: usize = 4096;

        /// Maximum length of a single quoted document value inside evidence
        pub const MAX_QUOTED_VALUE_CHARS: usize = 256;

        /// Maximum length of one entry in a set-scan offender listing
        /// SECURITY: Bounds each entry; listings themselves are never cut so
        /// no offender is dropped
        pub const MAX_OFFENDER_CHARS: usize = 512;

        /// Marker appended to truncated evidence
        pub const TRUNCATION_MARKER: &str = "...[truncated]";
    }

    pub mod logging {
        /// Events retained by the in-memory logger
        /// RESOURCE: Controls memory allocation for test capture
        pub const MEMORY_LOG_BUFFER_SIZE: usize = 10_000;
    }
}
