//! # CCE Scanner Base - Compliance Check Engine
//!
//! Fetches a device configuration over SSH/SFTP, parses it with the hardened
//! parser from `cce_parser`, and evaluates it against a registry of
//! independent compliance rules.

pub mod api;
pub mod results;
pub mod rules;
pub mod transport;

// Convenience re-exports
pub use api::*;

pub mod prelude {
    pub use crate::api::{
        BatchJob, BatchRunResult, ComplianceScanner, ScannerConfig, ScannerError,
    };

    pub use crate::results::{
        evidence, RunFailure, RunResult, RunStatus, RunSummary, Verdict, VerdictStatus,
    };

    pub use crate::rules::{
        Category, Evaluator, Finding, RegistryBuilder, RegistryError, RuleCatalogEntry,
        RuleDefinition, RuleFault, RuleParameters, RuleRegistry, Threshold, ThresholdOperator,
    };

    pub use crate::transport::{
        CancelToken, ConnectionDescriptor, FetchError, FetchStage, HostKeyPolicy, KeyCredential,
        RemoteConfigFetcher, Transport, TransportSession,
    };

    pub use cce_parser::{ConfigNode, ConfigurationModel, Flag, Lookup, RawConfigurationDocument, Section};
}
