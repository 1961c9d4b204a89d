//! Rule registry and evaluator
//!
//! Rules are registered once at startup and keyed by control number. The
//! registry is read-only afterwards and may be shared across concurrent runs.
//! `evaluate_all` yields exactly one verdict per registered rule, in rule id
//! order, whatever the individual evaluators do.

use super::definition::{Category, Finding, RuleCatalogEntry, RuleDefinition, RuleId};
use super::errors::{RegistryError, RuleFault};
use crate::results::{Verdict, VerdictStatus};
use cce_parser::logging::codes;
use cce_parser::{log_debug, log_error, log_success, ConfigurationModel};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

pub struct RuleRegistry {
    rules: BTreeMap<RuleId, RuleDefinition>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, rule: RuleDefinition) -> Result<(), RegistryError> {
        if self.rules.contains_key(rule.id()) {
            return Err(RegistryError::DuplicateRule {
                id: rule.id().to_string(),
            });
        }
        log_debug!("Rule registered", "rule" => rule.id(), "category" => rule.category());
        self.rules.insert(rule.id().clone(), rule);
        Ok(())
    }

    pub fn register_all(
        &mut self,
        rules: impl IntoIterator<Item = RuleDefinition>,
    ) -> Result<(), RegistryError> {
        for rule in rules {
            self.register(rule)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&RuleDefinition, RegistryError> {
        let key = RuleId::parse(id)?;
        self.rules
            .get(&key)
            .ok_or_else(|| RegistryError::UnknownRule { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.values()
    }

    /// Registered rules as data, in rule id order
    pub fn catalog(&self) -> Vec<RuleCatalogEntry> {
        self.rules.values().map(RuleCatalogEntry::from).collect()
    }

    pub fn get_statistics(&self) -> RegistryStatistics {
        let mut rules_by_category = BTreeMap::new();
        let mut parameterized_rules = 0;
        for rule in self.rules.values() {
            *rules_by_category.entry(rule.category()).or_insert(0) += 1;
            if !matches!(rule.parameters(), super::RuleParameters::None) {
                parameterized_rules += 1;
            }
        }
        RegistryStatistics {
            total_rules: self.rules.len(),
            rules_by_category,
            parameterized_rules,
            registry_health: self.assess_registry_health(),
        }
    }

    fn assess_registry_health(&self) -> RegistryHealth {
        if self.rules.is_empty() {
            RegistryHealth::Empty
        } else {
            RegistryHealth::Healthy
        }
    }

    /// Evaluate every registered rule against `model`
    pub fn evaluate_all(&self, model: &ConfigurationModel) -> Vec<Verdict> {
        let verdicts: Vec<Verdict> = self
            .rules
            .values()
            .map(|rule| evaluate_isolated(rule, model))
            .collect();

        log_success!(
            codes::success::EVALUATION_COMPLETE,
            "Rule evaluation complete",
            "rules" => verdicts.len(),
            "not_reviewed" => verdicts.iter().filter(|v| v.status() == VerdictStatus::NotReviewed).count()
        );
        verdicts
    }

    /// Evaluate a single rule by id
    pub fn evaluate_rule(&self, id: &str, model: &ConfigurationModel) -> Result<Verdict, RegistryError> {
        let rule = self.get(id)?;
        Ok(evaluate_isolated(rule, model))
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one evaluator; faults and panics become a `NotReviewed` verdict
fn evaluate_isolated(rule: &RuleDefinition, model: &ConfigurationModel) -> Verdict {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(model)))
        .unwrap_or_else(|payload| {
            Err(RuleFault::Panicked {
                message: panic_message(payload.as_ref()),
            })
        });

    let finding = match outcome {
        Ok(finding) => finding,
        Err(fault) => {
            log_error!(
                fault.error_code(),
                "Rule evaluation faulted",
                "rule" => rule.id(),
                "fault" => &fault
            );
            Finding::not_reviewed(format!("evaluation failed: {}", fault))
        }
    };

    Verdict::new(
        rule.id(),
        rule.title(),
        rule.category(),
        finding.status,
        Some(finding.evidence.as_str()),
    )
    .with_offenders(&finding.offenders)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ============================================================================
// Supporting Data Structures
// ============================================================================

#[derive(Debug, Clone)]
pub struct RegistryStatistics {
    pub total_rules: usize,
    pub rules_by_category: BTreeMap<Category, usize>,
    pub parameterized_rules: usize,
    pub registry_health: RegistryHealth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryHealth {
    Healthy,
    Empty,
}

impl RegistryHealth {
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Empty => "empty",
        }
    }
}

// ============================================================================
// Registry Builder
// ============================================================================

pub struct RegistryBuilder {
    registry: RuleRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: RuleRegistry::new(),
        }
    }

    pub fn add_rule(mut self, rule: RuleDefinition) -> Result<Self, RegistryError> {
        self.registry.register(rule)?;
        Ok(self)
    }

    pub fn add_rules(
        mut self,
        rules: impl IntoIterator<Item = RuleDefinition>,
    ) -> Result<Self, RegistryError> {
        self.registry.register_all(rules)?;
        Ok(self)
    }

    pub fn build(self) -> RuleRegistry {
        log_success!(
            codes::success::RULE_REGISTERED,
            "Rule registry built",
            "rules" => self.registry.len()
        );
        self.registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ThresholdOperator;
    use crate::test_support::model_from_xml;
    use assert_matches::assert_matches;

    fn always_compliant(_: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
        Ok(Finding::compliant("fine"))
    }

    fn shape_fault(_: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
        Err(RuleFault::unexpected_shape("system/webgui/session_timeout", "not a number"))
    }

    fn panics(_: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
        panic!("index out of range")
    }

    fn session_timeout(model: &ConfigurationModel, rule: &RuleDefinition) -> Result<Finding, RuleFault> {
        let threshold = rule.threshold()?;
        let Some(raw) = model.value("system/webgui/session_timeout") else {
            return Ok(Finding::non_compliant("session timeout not set"));
        };
        let actual: i64 = raw
            .parse()
            .map_err(|_| RuleFault::unexpected_shape("system/webgui/session_timeout", raw))?;
        let evidence = format!("session timeout {} minutes, {}", actual, threshold.describe());
        Ok(if threshold.holds(actual) {
            Finding::compliant(evidence)
        } else {
            Finding::non_compliant(evidence)
        })
    }

    fn rule(id: &str, evaluator: crate::rules::Evaluator) -> RuleDefinition {
        RuleDefinition::new(id, "test rule", Category::System, evaluator).unwrap()
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = RuleRegistry::new();
        registry.register(rule("1.4", always_compliant)).unwrap();
        assert_matches!(
            registry.register(rule("1.4", always_compliant)),
            Err(RegistryError::DuplicateRule { .. })
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_faults_are_isolated() {
        let registry = RegistryBuilder::new()
            .add_rules(vec![
                rule("1.4", always_compliant),
                rule("1.5", shape_fault),
                rule("1.6", panics),
                rule("1.8", always_compliant),
            ])
            .unwrap()
            .build();
        let model = model_from_xml("<pfsense><system/></pfsense>");

        let verdicts = registry.evaluate_all(&model);
        assert_eq!(verdicts.len(), 4);

        let statuses: Vec<VerdictStatus> = verdicts.iter().map(Verdict::status).collect();
        assert_eq!(
            statuses,
            vec![
                VerdictStatus::Compliant,
                VerdictStatus::NotReviewed,
                VerdictStatus::NotReviewed,
                VerdictStatus::Compliant
            ]
        );
        assert!(verdicts[1].evidence().unwrap().contains("not a number"));
        assert!(verdicts[2].evidence().unwrap().contains("index out of range"));
    }

    #[test]
    fn test_registration_order_does_not_matter() {
        let forward = RegistryBuilder::new()
            .add_rules(vec![rule("2.1", always_compliant), rule("10.1", shape_fault)])
            .unwrap()
            .build();
        let reverse = RegistryBuilder::new()
            .add_rules(vec![rule("10.1", shape_fault), rule("2.1", always_compliant)])
            .unwrap()
            .build();
        let model = model_from_xml("<pfsense/>");

        assert_eq!(forward.evaluate_all(&model), reverse.evaluate_all(&model));
        assert_eq!(forward.evaluate_all(&model), forward.evaluate_all(&model));
        assert_eq!(forward.evaluate_all(&model)[0].rule_id(), "2.1");
    }

    #[test]
    fn test_threshold_exceeded_reports_actual_and_expected() {
        let registry = RegistryBuilder::new()
            .add_rule(
                RuleDefinition::new("2.1", "Session timeout", Category::Access, session_timeout)
                    .unwrap()
                    .with_threshold(ThresholdOperator::Le, 10, "minutes"),
            )
            .unwrap()
            .build();
        let model = model_from_xml(
            "<pfsense><system><webgui><session_timeout>240</session_timeout></webgui></system></pfsense>",
        );

        let verdict = registry.evaluate_rule("2.1", &model).unwrap();
        assert_eq!(verdict.status(), VerdictStatus::NonCompliant);
        assert_eq!(
            verdict.evidence(),
            Some("session timeout 240 minutes, expected <= 10 minutes")
        );
    }

    #[test]
    fn test_missing_parameters_become_not_reviewed() {
        let registry = RegistryBuilder::new()
            .add_rule(rule("2.1", session_timeout))
            .unwrap()
            .build();
        let verdict = registry
            .evaluate_rule("2.1", &model_from_xml("<pfsense/>"))
            .unwrap();
        assert_eq!(verdict.status(), VerdictStatus::NotReviewed);
    }

    #[test]
    fn test_catalog_and_statistics() {
        let registry = RegistryBuilder::new()
            .add_rules(vec![rule("1.5", always_compliant), rule("1.4", always_compliant)])
            .unwrap()
            .build();

        let catalog = registry.catalog();
        assert_eq!(catalog[0].id.as_str(), "1.4");
        let stats = registry.get_statistics();
        assert_eq!(stats.total_rules, 2);
        assert!(stats.registry_health.is_healthy());
        assert_eq!(RuleRegistry::new().get_statistics().registry_health, RegistryHealth::Empty);
        assert_matches!(registry.get("9.9"), Err(RegistryError::UnknownRule { .. }));
    }
}
