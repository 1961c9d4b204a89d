//! Logging and monitoring rules (sections 5.1, 5.2 and 6)

use super::snmp_enabled;
use cce_parser::ConfigurationModel;
use cce_scanner_base::results::evidence::quote;
use cce_scanner_base::rules::{Category, Finding, RegistryError, RuleDefinition, RuleFault};

const REMOTE_SYSLOG_KEYS: [&str; 3] = ["remoteserver", "remoteserver2", "remoteserver3"];

pub fn definitions() -> Result<Vec<RuleDefinition>, RegistryError> {
    Ok(vec![
        RuleDefinition::new(
            "5.1.1",
            "Ensure SNMP trap receiver is configured",
            Category::Logging,
            snmp_trap_server,
        )?,
        RuleDefinition::new(
            "5.1.2",
            "Ensure SNMP trap community is configured",
            Category::Logging,
            snmp_trap_community,
        )?,
        RuleDefinition::new(
            "5.2.1",
            "Ensure timezone is configured",
            Category::Logging,
            timezone_configured,
        )?,
        RuleDefinition::new(
            "6.1",
            "Ensure remote syslog is configured",
            Category::Logging,
            remote_syslog,
        )?,
    ])
}

fn snmp_trap_server(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    if !snmp_enabled(model) {
        return Ok(Finding::not_applicable("SNMP appears disabled."));
    }
    Ok(match model.value("snmpd/trapserver") {
        Some(server) => Finding::compliant(format!("SNMP trap receiver {}.", quote(server))),
        None => Finding::non_compliant("SNMP is enabled but no trap receiver is configured."),
    })
}

fn snmp_trap_community(
    model: &ConfigurationModel,
    _: &RuleDefinition,
) -> Result<Finding, RuleFault> {
    if !snmp_enabled(model) {
        return Ok(Finding::not_applicable("SNMP appears disabled."));
    }
    // The community string itself is a secret; report presence only
    Ok(if model.value("snmpd/trapstring").is_some() {
        Finding::compliant("SNMP trap community is configured.")
    } else {
        Finding::non_compliant("SNMP is enabled but no trap community is configured.")
    })
}

fn timezone_configured(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    Ok(match model.value("system/timezone") {
        Some(zone) => Finding::compliant(format!("System time zone set to {}.", quote(zone))),
        None => Finding::non_compliant("System time zone is not set."),
    })
}

fn remote_syslog(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    let servers: Vec<String> = REMOTE_SYSLOG_KEYS
        .iter()
        .filter_map(|key| model.value(&format!("syslog/{}", key)))
        .map(quote)
        .collect();
    Ok(if servers.is_empty() {
        Finding::non_compliant("No remote syslog server configured.")
    } else {
        Finding::compliant(format!(
            "Remote syslog server(s) configured: {}",
            servers.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::verdict;
    use cce_scanner_base::results::VerdictStatus;

    fn check(id: &str, body: &str) -> (VerdictStatus, String) {
        let v = verdict(definitions().unwrap(), id, &format!("<pfsense>{}</pfsense>", body));
        (v.status(), v.evidence().unwrap_or_default().to_string())
    }

    #[test]
    fn test_traps_not_applicable_without_snmp() {
        assert_eq!(check("5.1.1", "<snmpd/>").0, VerdictStatus::NotApplicable);
        assert_eq!(check("5.1.2", "").0, VerdictStatus::NotApplicable);
    }

    #[test]
    fn test_trap_server_and_community() {
        let snmp = "<snmpd><rocommunity>ro</rocommunity><trapserver>192.0.2.50</trapserver></snmpd>";
        assert_eq!(check("5.1.1", snmp).0, VerdictStatus::Compliant);
        assert_eq!(check("5.1.2", snmp).0, VerdictStatus::NonCompliant);

        let (status, evidence) = check(
            "5.1.2",
            "<snmpd><rocommunity>ro</rocommunity><trapstring>s3cret</trapstring></snmpd>",
        );
        assert_eq!(status, VerdictStatus::Compliant);
        assert!(!evidence.contains("s3cret"));
    }

    #[test]
    fn test_timezone() {
        assert_eq!(
            check("5.2.1", "<system><timezone>Etc/UTC</timezone></system>").0,
            VerdictStatus::Compliant
        );
        assert_eq!(check("5.2.1", "<system/>").0, VerdictStatus::NonCompliant);
    }

    #[test]
    fn test_remote_syslog_lists_all_targets() {
        let (status, evidence) = check(
            "6.1",
            "<syslog><remoteserver>10.0.0.9:514</remoteserver><remoteserver3>10.0.0.10</remoteserver3></syslog>",
        );
        assert_eq!(status, VerdictStatus::Compliant);
        assert!(evidence.ends_with("'10.0.0.9:514', '10.0.0.10'"));
        assert_eq!(check("6.1", "<syslog/>").0, VerdictStatus::NonCompliant);
    }
}
