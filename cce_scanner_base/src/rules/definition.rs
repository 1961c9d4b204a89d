//! Rule definitions
//!
//! A rule is static data plus a pure evaluator over the configuration model.
//! Threshold and forbidden-value constants are declared on the definition
//! and read back by the evaluator through [`RuleDefinition::threshold`] and
//! [`RuleDefinition::forbidden_values`].

use super::errors::{RegistryError, RuleFault};
use crate::results::VerdictStatus;
use cce_parser::ConfigurationModel;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

// ============================================================================
// RULE IDENTIFIERS
// ============================================================================

static RULE_ID_PATTERN: OnceLock<Result<Regex, String>> = OnceLock::new();

/// Compiled once per process
fn rule_id_pattern() -> Result<&'static Regex, String> {
    RULE_ID_PATTERN
        .get_or_init(|| Regex::new(r"^\d+(\.\d+)*$").map_err(|e| e.to_string()))
        .as_ref()
        .map_err(Clone::clone)
}

/// Dotted benchmark control number (`4.1.2`), ordered numerically
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleId {
    raw: String,
    segments: Vec<u32>,
}

impl RuleId {
    pub fn parse(id: &str) -> Result<Self, RegistryError> {
        let pattern = rule_id_pattern().map_err(|reason| RegistryError::InvalidRuleId {
            id: id.to_string(),
            reason,
        })?;
        if !pattern.is_match(id) {
            return Err(RegistryError::InvalidRuleId {
                id: id.to_string(),
                reason: "expected dotted control number such as 4.1.2".to_string(),
            });
        }

        let segments = id
            .split('.')
            .map(|s| s.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RegistryError::InvalidRuleId {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            raw: id.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Leading control group (`4` for `4.1.2`)
    pub fn group(&self) -> u32 {
        self.segments.first().copied().unwrap_or(0)
    }
}

impl Ord for RuleId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments
            .cmp(&other.segments)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for RuleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for RuleId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

// ============================================================================
// CATEGORIES AND PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    System,
    Access,
    Services,
    Firewall,
    Logging,
    Vpn,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Access => "access",
            Self::Services => "services",
            Self::Firewall => "firewall",
            Self::Logging => "logging",
            Self::Vpn => "vpn",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThresholdOperator {
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">=")]
    Ge,
}

impl ThresholdOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Le => "<=",
            Self::Lt => "<",
            Self::Eq => "=",
            Self::Ge => ">=",
        }
    }

    /// Whether `actual <op> limit` holds
    pub fn holds(&self, actual: i64, limit: i64) -> bool {
        match self {
            Self::Le => actual <= limit,
            Self::Lt => actual < limit,
            Self::Eq => actual == limit,
            Self::Ge => actual >= limit,
        }
    }
}

impl fmt::Display for ThresholdOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Numeric bound declared by a threshold rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Threshold {
    pub operator: ThresholdOperator,
    pub limit: i64,
    pub unit: &'static str,
}

impl Threshold {
    pub fn holds(&self, actual: i64) -> bool {
        self.operator.holds(actual, self.limit)
    }

    /// `expected <= 10 minutes`
    pub fn describe(&self) -> String {
        format!("expected {} {} {}", self.operator, self.limit, self.unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleParameters {
    None,
    Threshold(Threshold),
    Forbidden { values: &'static [&'static str] },
}

// ============================================================================
// FINDINGS
// ============================================================================

/// Evaluator output before it becomes a verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub status: VerdictStatus,
    pub evidence: String,
    /// Set-scan offenders, listed in full after `evidence`
    pub offenders: Vec<String>,
}

impl Finding {
    pub fn compliant(evidence: impl Into<String>) -> Self {
        Self::with_status(VerdictStatus::Compliant, evidence)
    }

    pub fn non_compliant(evidence: impl Into<String>) -> Self {
        Self::with_status(VerdictStatus::NonCompliant, evidence)
    }

    /// Preconditions for the rule are absent from the configuration
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self::with_status(VerdictStatus::NotApplicable, reason)
    }

    pub fn not_reviewed(reason: impl Into<String>) -> Self {
        Self::with_status(VerdictStatus::NotReviewed, reason)
    }

    /// Non-compliant set scan; every offender survives into the verdict
    pub fn offenders(summary: impl Into<String>, offenders: Vec<String>) -> Self {
        Self {
            status: VerdictStatus::NonCompliant,
            evidence: summary.into(),
            offenders,
        }
    }

    fn with_status(status: VerdictStatus, evidence: impl Into<String>) -> Self {
        Self {
            status,
            evidence: evidence.into(),
            offenders: Vec::new(),
        }
    }
}

pub type Evaluator = fn(&ConfigurationModel, &RuleDefinition) -> Result<Finding, RuleFault>;

// ============================================================================
// DEFINITIONS
// ============================================================================

#[derive(Clone)]
pub struct RuleDefinition {
    id: RuleId,
    title: String,
    category: Category,
    parameters: RuleParameters,
    evaluator: Evaluator,
}

impl RuleDefinition {
    pub fn new(
        id: &str,
        title: &str,
        category: Category,
        evaluator: Evaluator,
    ) -> Result<Self, RegistryError> {
        let id = RuleId::parse(id)?;
        if title.trim().is_empty() {
            return Err(RegistryError::EmptyTitle { id: id.to_string() });
        }
        Ok(Self {
            id,
            title: title.to_string(),
            category,
            parameters: RuleParameters::None,
            evaluator,
        })
    }

    pub fn with_parameters(mut self, parameters: RuleParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_threshold(self, operator: ThresholdOperator, limit: i64, unit: &'static str) -> Self {
        self.with_parameters(RuleParameters::Threshold(Threshold {
            operator,
            limit,
            unit,
        }))
    }

    pub fn with_forbidden(self, values: &'static [&'static str]) -> Self {
        self.with_parameters(RuleParameters::Forbidden { values })
    }

    pub fn id(&self) -> &RuleId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn parameters(&self) -> &RuleParameters {
        &self.parameters
    }

    pub fn threshold(&self) -> Result<Threshold, RuleFault> {
        match self.parameters {
            RuleParameters::Threshold(threshold) => Ok(threshold),
            _ => Err(RuleFault::invalid_parameters(format!(
                "rule {} declares no threshold",
                self.id
            ))),
        }
    }

    pub fn forbidden_values(&self) -> Result<&'static [&'static str], RuleFault> {
        match self.parameters {
            RuleParameters::Forbidden { values } => Ok(values),
            _ => Err(RuleFault::invalid_parameters(format!(
                "rule {} declares no forbidden values",
                self.id
            ))),
        }
    }

    pub(crate) fn evaluate(&self, model: &ConfigurationModel) -> Result<Finding, RuleFault> {
        (self.evaluator)(model, self)
    }
}

impl fmt::Debug for RuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDefinition")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("category", &self.category)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Listing entry for a registered rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleCatalogEntry {
    pub id: RuleId,
    pub title: String,
    pub category: Category,
    pub parameters: RuleParameters,
}

impl From<&RuleDefinition> for RuleCatalogEntry {
    fn from(rule: &RuleDefinition) -> Self {
        Self {
            id: rule.id.clone(),
            title: rule.title.clone(),
            category: rule.category,
            parameters: rule.parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn noop(_: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
        Ok(Finding::compliant("ok"))
    }

    #[test]
    fn test_rule_ids_sort_numerically() {
        let mut ids: Vec<RuleId> = ["4.1.10", "1.10", "4.1.2", "1.4", "2.1"]
            .iter()
            .map(|s| RuleId::parse(s).unwrap())
            .collect();
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(RuleId::as_str).collect();
        assert_eq!(sorted, vec!["1.4", "1.10", "2.1", "4.1.2", "4.1.10"]);
    }

    #[test]
    fn test_rule_id_pattern_is_compiled_once() {
        let first = rule_id_pattern().unwrap();
        RuleId::parse("1.1").unwrap();
        RuleId::parse("6.3.2").unwrap();
        assert!(std::ptr::eq(first, rule_id_pattern().unwrap()));
        assert_matches!(RuleId::parse("1.x"), Err(RegistryError::InvalidRuleId { .. }));
    }

    #[test]
    fn test_invalid_rule_ids() {
        for bad in ["", "a.1", "1..2", "1.", "4.1 "] {
            assert_matches!(RuleId::parse(bad), Err(RegistryError::InvalidRuleId { .. }));
        }
        assert_matches!(
            RuleDefinition::new("1.1", "  ", Category::System, noop),
            Err(RegistryError::EmptyTitle { .. })
        );
    }

    #[test]
    fn test_threshold_parameters() {
        let rule = RuleDefinition::new("2.1", "Session timeout", Category::Access, noop)
            .unwrap()
            .with_threshold(ThresholdOperator::Le, 10, "minutes");

        let threshold = rule.threshold().unwrap();
        assert!(threshold.holds(10));
        assert!(!threshold.holds(11));
        assert_eq!(threshold.describe(), "expected <= 10 minutes");
        assert_matches!(rule.forbidden_values(), Err(RuleFault::InvalidParameters { .. }));

        let json = serde_json::to_string(rule.parameters()).unwrap();
        assert_eq!(json, r#"{"kind":"threshold","operator":"<=","limit":10,"unit":"minutes"}"#);
    }
}
