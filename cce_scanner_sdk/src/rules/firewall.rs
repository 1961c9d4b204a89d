//! WAN firewall rule scans (section 4.1)
//!
//! Every rule here is a set scan over `filter/rule` entries whose interface
//! list includes `wan`. All offenders are reported, labelled by description,
//! tracker id or position in the filter rule list.

use super::{list_contains, offender_label, scan_finding};
use cce_parser::{ConfigNode, ConfigurationModel, Section};
use cce_scanner_base::rules::{Category, Finding, RegistryError, RuleDefinition, RuleFault};

pub fn definitions() -> Result<Vec<RuleDefinition>, RegistryError> {
    Ok(vec![
        RuleDefinition::new(
            "4.1.1",
            "Ensure no WAN rules allow ANY destination",
            Category::Firewall,
            any_destination,
        )?,
        RuleDefinition::new(
            "4.1.2",
            "Ensure no WAN rules allow ANY source",
            Category::Firewall,
            any_source,
        )?,
        RuleDefinition::new(
            "4.1.3",
            "Ensure no WAN rules allow ANY service",
            Category::Firewall,
            any_service,
        )?,
        RuleDefinition::new(
            "4.1.4",
            "Ensure there are no disabled WAN rules",
            Category::Firewall,
            disabled_rules,
        )?,
        RuleDefinition::new(
            "4.1.5",
            "Ensure logging is enabled on all WAN rules",
            Category::Firewall,
            logging_enabled,
        )?,
        RuleDefinition::new(
            "4.1.6",
            "Ensure WAN ICMP rules specify an ICMP type",
            Category::Firewall,
            icmp_types,
        )?,
    ])
}

// ============================================================================
// WAN RULE SCAN
// ============================================================================

struct WanRule<'a> {
    node: &'a ConfigNode,
    /// 1-based position among all filter rules
    position: usize,
}

/// `None` when the configuration has no filter section at all
fn wan_rules(model: &ConfigurationModel) -> Option<Vec<WanRule<'_>>> {
    let filter = model.section(Section::Filter).node()?;
    Some(
        filter
            .children_named("rule")
            .enumerate()
            .filter(|(_, rule)| {
                rule.value_at("interface")
                    .map_or(false, |interfaces| list_contains(interfaces, "wan"))
            })
            .map(|(index, node)| WanRule {
                node,
                position: index + 1,
            })
            .collect(),
    )
}

fn scan(
    model: &ConfigurationModel,
    offends: fn(&ConfigNode) -> bool,
    found: &str,
    clean: &str,
) -> Result<Finding, RuleFault> {
    let Some(rules) = wan_rules(model) else {
        return Ok(Finding::not_applicable("No firewall filter configuration."));
    };
    let offenders: Vec<String> = rules
        .iter()
        .filter(|rule| offends(rule.node))
        .map(|rule| offender_label(rule.node, rule.position))
        .collect();
    Ok(scan_finding(&offenders, found, clean))
}

/// Source or destination block matching anything
fn is_any(endpoint: Option<&ConfigNode>) -> bool {
    let Some(endpoint) = endpoint else {
        return false;
    };
    endpoint.has_child("any")
        || endpoint
            .value_at("network")
            .or_else(|| endpoint.value_at("address"))
            .map_or(false, |address| address.eq_ignore_ascii_case("any"))
}

fn protocol(rule: &ConfigNode) -> String {
    rule.value_at("protocol")
        .unwrap_or_default()
        .to_ascii_lowercase()
}

// ============================================================================
// EVALUATORS
// ============================================================================

fn any_destination(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    scan(
        model,
        |rule| is_any(rule.child("destination")),
        "WAN rule(s) allow ANY destination",
        "No WAN rules allow ANY destination.",
    )
}

fn any_source(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    scan(
        model,
        |rule| is_any(rule.child("source")),
        "WAN rule(s) allow ANY source",
        "No WAN rules allow ANY source.",
    )
}

fn any_service(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    scan(
        model,
        |rule| matches!(protocol(rule).as_str(), "" | "any" | "all"),
        "WAN rule(s) permit ANY service/protocol",
        "No WAN rules allow ANY service/protocol.",
    )
}

fn disabled_rules(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    scan(
        model,
        |rule| rule.flag_at("disabled").is_enabled(),
        "WAN rule(s) are disabled",
        "No disabled WAN rules.",
    )
}

fn logging_enabled(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    scan(
        model,
        |rule| !rule.flag_at("log").is_enabled(),
        "WAN rule(s) do not have logging enabled",
        "All WAN rules have logging enabled.",
    )
}

fn icmp_types(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    scan(
        model,
        |rule| {
            protocol(rule) == "icmp"
                && rule
                    .value_at("icmptype")
                    .map_or(true, |t| t.eq_ignore_ascii_case("any"))
        },
        "WAN ICMP rule(s) without a specific ICMP type",
        "All WAN ICMP rules specify ICMP types.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::verdict;
    use cce_scanner_base::results::VerdictStatus;

    const RULES: &str = r#"<pfsense><filter>
  <rule>
    <tracker>1001</tracker><interface>wan</interface><protocol>tcp</protocol>
    <source><any/></source><destination><address>10.0.0.5</address></destination>
    <descr>Allow web</descr><log/>
  </rule>
  <rule>
    <tracker>1002</tracker><interface>lan</interface>
    <source><any/></source><destination><any/></destination>
  </rule>
  <rule>
    <tracker>1003</tracker><interface>wan</interface><protocol>icmp</protocol><icmptype>any</icmptype>
    <source><network>any</network></source><destination><any/></destination>
    <disabled/>
  </rule>
  <rule>
    <interface>opt1,wan</interface><protocol>any</protocol>
    <source><address>any</address></source><destination><address>any</address></destination>
  </rule>
  <rule>
    <tracker>1005</tracker><interface>wan</interface><protocol>icmp</protocol><icmptype>echoreq</icmptype>
    <source><address>192.0.2.0/24</address></source><destination><network>wanip</network></destination>
    <log/>
  </rule>
</filter></pfsense>"#;

    fn check(id: &str, xml: &str) -> (VerdictStatus, String) {
        let v = verdict(definitions().unwrap(), id, xml);
        (v.status(), v.evidence().unwrap_or_default().to_string())
    }

    #[test]
    fn test_any_source_reports_every_offender() {
        let (status, evidence) = check("4.1.2", RULES);
        assert_eq!(status, VerdictStatus::NonCompliant);
        assert_eq!(
            evidence,
            "3 WAN rule(s) allow ANY source: 'Allow web', tracker '1003', #4"
        );
    }

    #[test]
    fn test_any_destination_skips_lan_rules() {
        let (status, evidence) = check("4.1.1", RULES);
        assert_eq!(status, VerdictStatus::NonCompliant);
        assert!(evidence.starts_with("2 WAN rule(s)"));
        assert!(!evidence.contains("1002"));
    }

    #[test]
    fn test_any_service() {
        let (_, evidence) = check("4.1.3", RULES);
        assert_eq!(evidence, "1 WAN rule(s) permit ANY service/protocol: #4");
    }

    #[test]
    fn test_disabled_and_logging() {
        let (_, evidence) = check("4.1.4", RULES);
        assert_eq!(evidence, "1 WAN rule(s) are disabled: tracker '1003'");

        let (_, evidence) = check("4.1.5", RULES);
        assert_eq!(
            evidence,
            "2 WAN rule(s) do not have logging enabled: tracker '1003', #4"
        );
    }

    #[test]
    fn test_icmp_types() {
        let (_, evidence) = check("4.1.6", RULES);
        assert_eq!(
            evidence,
            "1 WAN ICMP rule(s) without a specific ICMP type: tracker '1003'"
        );
    }

    #[test]
    fn test_large_rule_sets_report_every_offender() {
        let rules: String = (1..=120)
            .map(|i| {
                format!(
                    "<rule><interface>wan</interface><protocol>tcp</protocol>\
                     <source><any/></source><destination><address>10.0.0.{}</address></destination>\
                     <descr>Inbound service number {:03}</descr></rule>",
                    i % 250,
                    i
                )
            })
            .collect();
        let (status, evidence) = check("4.1.2", &format!("<pfsense><filter>{}</filter></pfsense>", rules));

        assert_eq!(status, VerdictStatus::NonCompliant);
        assert!(evidence.starts_with("120 WAN rule(s) allow ANY source: "));
        for i in 1..=120 {
            assert!(
                evidence.contains(&format!("'Inbound service number {:03}'", i)),
                "offender {} missing",
                i
            );
        }
        assert!(!evidence.contains("[truncated]"));
    }

    #[test]
    fn test_no_filter_section_is_not_applicable() {
        for id in ["4.1.1", "4.1.2", "4.1.3", "4.1.4", "4.1.5", "4.1.6"] {
            assert_eq!(check(id, "<pfsense><system/></pfsense>").0, VerdictStatus::NotApplicable);
        }
    }

    #[test]
    fn test_filter_without_wan_rules_is_compliant() {
        let (status, _) = check(
            "4.1.1",
            "<pfsense><filter><rule><interface>lan</interface></rule></filter></pfsense>",
        );
        assert_eq!(status, VerdictStatus::Compliant);
    }
}
