//! # CCE Scanner SDK
//!
//! pfSense benchmark rules for the compliance check engine, the device
//! inventory format used for batch runs, and the `cce-scan` command line.

pub mod cli;
pub mod inventory;
pub mod rules;

use cce_scanner_base::rules::{RegistryBuilder, RegistryError, RuleRegistry};

/// Create a registry holding the full pfSense benchmark catalog
///
/// Includes:
/// - System settings (hostname, DNS, IPv6, WebGUI protocol, NTP)
/// - Access control (session timeout, external authentication servers)
/// - Services (SNMP, captive portal, NET-SNMP, DNSSEC)
/// - WAN firewall rule scans
/// - Logging (SNMP traps, timezone, remote syslog)
/// - VPN authentication, certificates, TLS keys and ciphers
pub fn create_benchmark_registry() -> Result<RuleRegistry, RegistryError> {
    Ok(RegistryBuilder::new()
        .add_rules(rules::system::definitions()?)?
        .add_rules(rules::access::definitions()?)?
        .add_rules(rules::services::definitions()?)?
        .add_rules(rules::firewall::definitions()?)?
        .add_rules(rules::logging::definitions()?)?
        .add_rules(rules::vpn::definitions()?)?
        .build())
}


#[cfg(test)]
mod tests {
    use super::*;
    use cce_parser::{parse, DocumentFormat, RawConfigurationDocument};
    use cce_scanner_base::results::VerdictStatus;
    use cce_scanner_base::rules::Category;

    const EXPECTED_IDS: [&str; 25] = [
        "1.4", "1.5", "1.6", "1.8", "1.10", "2.1", "2.2", "3.1", "3.2", "4.1.1", "4.1.2",
        "4.1.3", "4.1.4", "4.1.5", "4.1.6", "5.1.1", "5.1.2", "5.1.3", "5.2.1", "5.3.1",
        "5.4.1", "5.4.2", "5.4.3", "5.5.1", "6.1",
    ];

    #[test]
    fn test_registry_creation() {
        let registry = create_benchmark_registry().expect("Failed to create registry");
        let stats = registry.get_statistics();

        assert_eq!(stats.total_rules, EXPECTED_IDS.len());
        assert!(stats.registry_health.is_healthy());
        assert_eq!(stats.rules_by_category.get(&Category::Firewall), Some(&6));
        assert_eq!(stats.parameterized_rules, 2);

        let listed: Vec<String> = registry.catalog().into_iter().map(|e| e.id.to_string()).collect();
        assert_eq!(listed, EXPECTED_IDS);
    }

    #[test]
    fn test_every_rule_yields_one_verdict_on_empty_config() {
        let registry = create_benchmark_registry().unwrap();
        let model = parse(RawConfigurationDocument::new(
            b"<pfsense></pfsense>".to_vec(),
            DocumentFormat::Xml,
        ))
        .unwrap();

        let verdicts = registry.evaluate_all(&model);
        assert_eq!(verdicts.len(), EXPECTED_IDS.len());
        assert!(verdicts
            .iter()
            .all(|v| v.status() != VerdictStatus::NotReviewed));
        assert_eq!(verdicts, registry.evaluate_all(&model));
    }
}
