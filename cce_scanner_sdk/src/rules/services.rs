//! Network service rules (sections 3 and 5.1.3, 5.3.1)

use super::snmp_enabled;
use cce_parser::{ConfigurationModel, Section};
use cce_scanner_base::results::evidence::quote;
use cce_scanner_base::rules::{Category, Finding, RegistryError, RuleDefinition, RuleFault};

pub fn definitions() -> Result<Vec<RuleDefinition>, RegistryError> {
    Ok(vec![
        RuleDefinition::new(
            "3.1",
            "Ensure SNMP is disabled or restricted",
            Category::Services,
            snmp_disabled,
        )?,
        RuleDefinition::new(
            "3.2",
            "Ensure captive portal is disabled",
            Category::Services,
            captive_portal_disabled,
        )?,
        RuleDefinition::new(
            "5.1.3",
            "Ensure the NET-SNMP package is used for SNMP",
            Category::Services,
            netsnmp_package,
        )?,
        RuleDefinition::new(
            "5.3.1",
            "Ensure DNSSEC is enabled on the DNS resolver",
            Category::Services,
            dnssec_enabled,
        )?,
    ])
}

fn snmp_disabled(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    if !snmp_enabled(model) {
        return Ok(Finding::compliant(
            "SNMP read-only community is empty; SNMP appears to be disabled.",
        ));
    }
    let port = model.value("snmpd/pollport").map(quote);
    Ok(Finding::non_compliant(format!(
        "SNMP read-only community is configured (poll port {}).",
        port.as_deref().unwrap_or("default")
    )))
}

fn captive_portal_disabled(
    model: &ConfigurationModel,
    _: &RuleDefinition,
) -> Result<Finding, RuleFault> {
    let zones: Vec<&str> = match model.section(Section::CaptivePortal).node() {
        Some(portal) => portal.children().iter().map(|zone| zone.name()).collect(),
        None => Vec::new(),
    };
    Ok(if zones.is_empty() {
        Finding::compliant("No captive portal configuration present.")
    } else {
        Finding::non_compliant(format!(
            "Captive portal configuration present: {}",
            zones.into_iter().map(quote).collect::<Vec<_>>().join(", ")
        ))
    })
}

fn netsnmp_package(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    if !snmp_enabled(model) {
        return Ok(Finding::not_applicable("SNMP appears disabled."));
    }
    let installed = model
        .section(Section::InstalledPackages)
        .node()
        .map(|packages| packages.flattened_text_lowercase())
        .unwrap_or_default();

    Ok(if installed.contains("net-snmp") {
        Finding::compliant("NET-SNMP package is installed.")
    } else {
        Finding::non_compliant("SNMP is enabled but the NET-SNMP package is not installed.")
    })
}

fn dnssec_enabled(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    let Some(unbound) = model.section(Section::Unbound).node() else {
        return Ok(Finding::not_applicable("No Unbound DNS resolver configuration."));
    };
    Ok(if unbound.flag_at("dnssec").is_enabled() {
        Finding::compliant("Unbound DNS resolver has DNSSEC enabled.")
    } else {
        Finding::non_compliant("Unbound DNS resolver does not have DNSSEC enabled.")
    })
}
