//! # Public API for the compliance check engine
//!
//! High-level entry points: the scanner orchestrator, its configuration and
//! batch runs.

pub mod config;
pub mod errors;
pub mod scanner;

pub use config::ScannerConfig;
pub use errors::ScannerError;
pub use scanner::{BatchJob, BatchRunResult, BatchStatistics, ComplianceScanner, RunPhase};

pub use crate::results::{RunFailure, RunResult, RunStatus, RunSummary, Verdict, VerdictStatus};
pub use crate::rules::{
    Category, Finding, RegistryBuilder, RegistryError, RuleDefinition, RuleFault, RuleRegistry,
};
pub use crate::transport::{
    CancelToken, ConnectionDescriptor, FetchError, HostKeyPolicy, KeyCredential,
};
