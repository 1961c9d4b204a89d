//! # Compliance Scanner
//!
//! Orchestrates one device run: fetch, parse, evaluate every registered
//! rule, aggregate. Fetch and parse failures short-circuit to a failed
//! [`RunResult`] with zero verdicts; rule faults never end a run.
//!
//! The scanner keeps no state between runs. The registry is shared read-only,
//! so runs for different devices may proceed in parallel.

use crate::api::{ScannerConfig, ScannerError};
use crate::results::{RunFailure, RunResult, RunStatus};
use crate::rules::RuleRegistry;
use crate::transport::{
    CancelToken, ConnectionDescriptor, FetchedDocument, RemoteConfigFetcher, Transport,
};
use cce_parser::logging::{codes, with_device_context};
use cce_parser::{log_debug, log_success, log_warning, parse_with_options, RawConfigurationDocument};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Run state machine. `Evaluating` is only entered with a built model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Fetching,
    Parsing,
    Evaluating,
    Done,
    FetchFailed,
    ParseFailed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Evaluating => "evaluating",
            Self::Done => "done",
            Self::FetchFailed => "fetch-failed",
            Self::ParseFailed => "parse-failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::FetchFailed | Self::ParseFailed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(phase: RunPhase) {
    log_debug!("Run phase", "phase" => phase);
}

/// Complete compliance scanner
pub struct ComplianceScanner {
    fetcher: RemoteConfigFetcher,
    registry: Arc<RuleRegistry>,
    config: ScannerConfig,
}

impl ComplianceScanner {
    /// Create scanner over the SSH transport with default configuration
    pub fn new(registry: impl Into<Arc<RuleRegistry>>) -> Result<Self, ScannerError> {
        Self::with_config(ScannerConfig::default(), registry)
    }

    pub fn with_config(
        config: ScannerConfig,
        registry: impl Into<Arc<RuleRegistry>>,
    ) -> Result<Self, ScannerError> {
        config
            .validate()
            .map_err(|reason| ScannerError::ConfigurationError { reason })?;
        let registry = registry.into();
        if registry.is_empty() {
            return Err(ScannerError::EmptyRegistry);
        }

        Ok(Self {
            fetcher: RemoteConfigFetcher::new().with_max_bytes(config.parse_options.max_bytes),
            registry,
            config,
        })
    }

    /// Replace the transport (tests, alternative SSH stacks)
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.fetcher = RemoteConfigFetcher::with_transport(transport)
            .with_max_bytes(self.config.parse_options.max_bytes);
        self
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Run against the configured default remote path
    pub fn run_default(&self, descriptor: &ConnectionDescriptor) -> RunResult {
        self.run(descriptor, &self.config.default_remote_path)
    }

    pub fn run(&self, descriptor: &ConnectionDescriptor, remote_path: &str) -> RunResult {
        self.run_with_cancel(descriptor, remote_path, &CancelToken::new())
    }

    /// Cancelling `cancel` closes the connection and yields a `fetch-failed`
    /// result of kind `cancelled`
    pub fn run_with_cancel(
        &self,
        descriptor: &ConnectionDescriptor,
        remote_path: &str,
        cancel: &CancelToken,
    ) -> RunResult {
        with_device_context(&descriptor.device_id, || {
            let started_at = Utc::now();
            let clock = Instant::now();

            enter(RunPhase::Fetching);
            let result = match self.fetcher.fetch_with_cancel(descriptor, remote_path, cancel) {
                Ok(FetchedDocument {
                    document,
                    warnings,
                    host_key_fingerprint,
                }) => self
                    .parse_and_evaluate(&descriptor.device_id, started_at, document)
                    .with_warnings(warnings)
                    .with_fingerprint(host_key_fingerprint),
                Err(err) => {
                    enter(RunPhase::FetchFailed);
                    RunResult::failed(
                        &descriptor.device_id,
                        started_at,
                        RunStatus::FetchFailed,
                        RunFailure::new(err.kind(), &err.to_string(), err.is_transient()),
                    )
                }
            };

            finish(result, clock)
        })
    }

    /// Evaluate a document obtained out of band (local file, upload)
    pub fn evaluate_document(&self, device_id: &str, document: RawConfigurationDocument) -> RunResult {
        with_device_context(device_id, || {
            let started_at = Utc::now();
            let clock = Instant::now();
            finish(self.parse_and_evaluate(device_id, started_at, document), clock)
        })
    }

    fn parse_and_evaluate(
        &self,
        device_id: &str,
        started_at: DateTime<Utc>,
        document: RawConfigurationDocument,
    ) -> RunResult {
        enter(RunPhase::Parsing);
        // The document is consumed here; raw bytes do not outlive parsing
        let model = match parse_with_options(document, &self.config.parse_options) {
            Ok(model) => model,
            Err(err) => {
                enter(RunPhase::ParseFailed);
                return RunResult::failed(
                    device_id,
                    started_at,
                    RunStatus::ParseFailed,
                    RunFailure::new(err.reason.as_str(), &err.to_string(), false),
                );
            }
        };

        enter(RunPhase::Evaluating);
        let verdicts = self.registry.evaluate_all(&model);
        enter(RunPhase::Done);
        RunResult::completed(device_id, started_at, verdicts)
    }

    /// Run every job on a pool of `workers` threads. Results keep job order.
    pub fn run_batch(&self, jobs: &[BatchJob], workers: usize) -> Result<BatchRunResult, ScannerError> {
        if workers == 0 {
            return Err(ScannerError::ConfigurationError {
                reason: "batch needs at least one worker".to_string(),
            });
        }
        let workers = workers.min(jobs.len().max(1));
        let next = &AtomicUsize::new(0);

        let collected: Result<Vec<Vec<(usize, RunResult)>>, ScannerError> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|_| {
                        scope.spawn(move || {
                            let mut done = Vec::new();
                            loop {
                                let index = next.fetch_add(1, Ordering::SeqCst);
                                let Some(job) = jobs.get(index) else {
                                    break;
                                };
                                done.push((index, self.run(&job.descriptor, &job.remote_path)));
                            }
                            done
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|handle| {
                        handle.join().map_err(|_| ScannerError::WorkerFailed {
                            reason: "worker thread panicked".to_string(),
                        })
                    })
                    .collect()
            });

        let mut indexed: Vec<(usize, RunResult)> = collected?.into_iter().flatten().collect();
        indexed.sort_by_key(|(index, _)| *index);
        Ok(BatchRunResult::new(
            indexed.into_iter().map(|(_, result)| result).collect(),
        ))
    }
}

fn finish(result: RunResult, clock: Instant) -> RunResult {
    let result = result.with_duration(clock.elapsed().as_millis() as u64);
    match &result.failure {
        None => log_success!(
            codes::success::RUN_COMPLETE,
            "Run complete",
            "run_id" => result.run_id,
            "verdicts" => result.verdicts.len(),
            "non_compliant" => result.summary.non_compliant,
            "not_reviewed" => result.summary.not_reviewed,
            "duration_ms" => result.duration_ms
        ),
        Some(failure) => log_warning!(
            "Run ended without verdicts",
            "run_id" => result.run_id,
            "status" => result.status,
            "kind" => failure.kind
        ),
    }
    result
}

// ============================================================================
// BATCH RUNS
// ============================================================================

/// One device in a batch
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub descriptor: ConnectionDescriptor,
    pub remote_path: String,
}

impl BatchJob {
    pub fn new(descriptor: ConnectionDescriptor, remote_path: impl Into<String>) -> Self {
        Self {
            descriptor,
            remote_path: remote_path.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchRunResult {
    pub results: Vec<RunResult>,
    pub statistics: BatchStatistics,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStatistics {
    pub total_devices: usize,
    pub completed_runs: usize,
    pub fetch_failures: usize,
    pub parse_failures: usize,
    /// Completed runs with at least one non-compliant verdict
    pub devices_with_findings: usize,
    pub total_non_compliant: usize,
    pub total_not_reviewed: usize,
}

impl BatchRunResult {
    fn new(results: Vec<RunResult>) -> Self {
        let mut statistics = BatchStatistics {
            total_devices: results.len(),
            ..BatchStatistics::default()
        };
        for result in &results {
            match result.status {
                RunStatus::Completed => statistics.completed_runs += 1,
                RunStatus::FetchFailed => statistics.fetch_failures += 1,
                RunStatus::ParseFailed => statistics.parse_failures += 1,
            }
            if result.summary.non_compliant > 0 {
                statistics.devices_with_findings += 1;
            }
            statistics.total_non_compliant += result.summary.non_compliant;
            statistics.total_not_reviewed += result.summary.not_reviewed;
        }
        Self { results, statistics }
    }

    pub fn all_completed(&self) -> bool {
        self.statistics.completed_runs == self.statistics.total_devices
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.results)
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch Run Summary:\n\
         Devices: {}\n\
         Completed: {}\n\
         Fetch Failed: {}\n\
         Parse Failed: {}\n\
         Devices With Findings: {}\n\
         Non-Compliant Verdicts: {}\n\
         Not Reviewed Verdicts: {}",
            self.statistics.total_devices,
            self.statistics.completed_runs,
            self.statistics.fetch_failures,
            self.statistics.parse_failures,
            self.statistics.devices_with_findings,
            self.statistics.total_non_compliant,
            self.statistics.total_not_reviewed
        )
    }
}
