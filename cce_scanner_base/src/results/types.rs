//! # Run Result Types
//!
//! Verdicts and run results handed to the calling layer. All types serialize
//! to JSON for reporting and export.

use super::evidence;
use cce_parser::config::compile_time::evidence::MAX_OFFENDER_CHARS;
use crate::rules::{Category, RuleId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// VERDICTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictStatus {
    Compliant,
    NonCompliant,
    NotApplicable,
    /// The evaluator could not complete; needs manual review
    NotReviewed,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NonCompliant => "non-compliant",
            Self::NotApplicable => "not-applicable",
            Self::NotReviewed => "not-reviewed",
        }
    }

    /// Label used in human-readable reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::NonCompliant => "Non-Compliant",
            Self::NotApplicable => "N/A",
            Self::NotReviewed => "Not Reviewed",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one rule against one device. Evidence is always sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    rule_id: String,
    title: String,
    category: Category,
    status: VerdictStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    evidence: Option<String>,
}

impl Verdict {
    pub(crate) fn new(
        rule_id: &RuleId,
        title: &str,
        category: Category,
        status: VerdictStatus,
        evidence: Option<&str>,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            title: title.to_string(),
            category,
            status,
            evidence: evidence
                .filter(|e| !e.is_empty())
                .map(evidence::sanitize),
        }
    }

    /// Append a set-scan listing. Entries are capped one by one; the listing
    /// as a whole is not, so every offender stays visible.
    pub(crate) fn with_offenders(mut self, offenders: &[String]) -> Self {
        if offenders.is_empty() {
            return self;
        }
        let listing = offenders
            .iter()
            .map(|offender| evidence::sanitize_with_limit(offender, MAX_OFFENDER_CHARS))
            .collect::<Vec<_>>()
            .join(", ");
        self.evidence = Some(match self.evidence.take() {
            Some(summary) => format!("{}: {}", summary, listing),
            None => listing,
        });
        self
    }

    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn status(&self) -> VerdictStatus {
        self.status
    }

    pub fn evidence(&self) -> Option<&str> {
        self.evidence.as_deref()
    }
}

// ============================================================================
// RUN RESULTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Completed,
    FetchFailed,
    ParseFailed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::FetchFailed => "fetch-failed",
            Self::ParseFailed => "parse-failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run ended without verdicts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    /// `host-verification-failed`, `timeout`, `forbidden-dtd`, ...
    pub kind: String,
    pub message: String,
    /// Whether re-running later may succeed without operator action
    pub transient: bool,
}

impl RunFailure {
    pub fn new(kind: &str, message: &str, transient: bool) -> Self {
        Self {
            kind: kind.to_string(),
            message: evidence::sanitize(message),
            transient,
        }
    }
}

/// Verdict counts for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub compliant: usize,
    pub non_compliant: usize,
    pub not_applicable: usize,
    pub not_reviewed: usize,
    pub non_compliant_by_category: BTreeMap<Category, usize>,
}

impl RunSummary {
    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        let mut summary = Self {
            total: verdicts.len(),
            ..Self::default()
        };
        for verdict in verdicts {
            match verdict.status() {
                VerdictStatus::Compliant => summary.compliant += 1,
                VerdictStatus::NonCompliant => {
                    summary.non_compliant += 1;
                    *summary
                        .non_compliant_by_category
                        .entry(verdict.category())
                        .or_insert(0) += 1;
                }
                VerdictStatus::NotApplicable => summary.not_applicable += 1,
                VerdictStatus::NotReviewed => summary.not_reviewed += 1,
            }
        }
        summary
    }

    pub fn count(&self, status: VerdictStatus) -> usize {
        match status {
            VerdictStatus::Compliant => self.compliant,
            VerdictStatus::NonCompliant => self.non_compliant,
            VerdictStatus::NotApplicable => self.not_applicable,
            VerdictStatus::NotReviewed => self.not_reviewed,
        }
    }
}

/// Complete result for one device run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: String,
    pub device_id: String,
    /// Run start, always UTC
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_key_fingerprint: Option<String>,
    pub verdicts: Vec<Verdict>,
    pub summary: RunSummary,
}

impl RunResult {
    pub(crate) fn completed(
        device_id: &str,
        started_at: DateTime<Utc>,
        verdicts: Vec<Verdict>,
    ) -> Self {
        let summary = RunSummary::from_verdicts(&verdicts);
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            device_id: device_id.to_string(),
            started_at,
            duration_ms: 0,
            status: RunStatus::Completed,
            failure: None,
            warnings: Vec::new(),
            host_key_fingerprint: None,
            verdicts,
            summary,
        }
    }

    /// A failed run never carries verdicts
    pub(crate) fn failed(
        device_id: &str,
        started_at: DateTime<Utc>,
        status: RunStatus,
        failure: RunFailure,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            device_id: device_id.to_string(),
            started_at,
            duration_ms: 0,
            status,
            failure: Some(failure),
            warnings: Vec::new(),
            host_key_fingerprint: None,
            verdicts: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    pub(crate) fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub(crate) fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub(crate) fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.host_key_fingerprint = fingerprint;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn verdict(&self, rule_id: &str) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.rule_id() == rule_id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report
    pub fn summary_report(&self) -> String {
        let mut report = format!(
            "Device: {}\nRun: {}\nStarted: {}\nStatus: {}\n",
            self.device_id,
            self.run_id,
            self.started_at.to_rfc3339(),
            self.status
        );
        if let Some(fingerprint) = &self.host_key_fingerprint {
            report.push_str(&format!("Host key: {}\n", fingerprint));
        }
        for warning in &self.warnings {
            report.push_str(&format!("Warning: {}\n", warning));
        }
        if let Some(failure) = &self.failure {
            report.push_str(&format!("Failure ({}): {}\n", failure.kind, failure.message));
            return report;
        }

        for verdict in &self.verdicts {
            report.push_str(&format!(
                "  [{:<13}] {:<7} {}",
                verdict.status().label(),
                verdict.rule_id(),
                verdict.title()
            ));
            if let Some(evidence) = verdict.evidence() {
                report.push_str(&format!(" :: {}", evidence));
            }
            report.push('\n');
        }
        report.push_str(&format!(
            "Compliant: {}  Non-Compliant: {}  N/A: {}  Not Reviewed: {}",
            self.summary.compliant,
            self.summary.non_compliant,
            self.summary.not_applicable,
            self.summary.not_reviewed
        ));
        report
    }
}
