//! # pfSense Benchmark Rules
//!
//! One module per category. Each exposes `definitions()`; evaluators are
//! plain functions over the read-only configuration model.

pub mod access;
pub mod firewall;
pub mod logging;
pub mod services;
pub mod system;
pub mod vpn;

use cce_parser::{ConfigNode, ConfigurationModel};
use cce_scanner_base::results::evidence::quote;
use cce_scanner_base::rules::Finding;

/// Human label for an element of a repeated structure: its description,
/// then a stable id, then its 1-based position
pub(crate) fn offender_label(node: &ConfigNode, position: usize) -> String {
    for key in ["descr", "description"] {
        if let Some(text) = node.value_at(key) {
            return quote(text);
        }
    }
    for key in ["tracker", "vpnid", "ikeid"] {
        if let Some(id) = node.value_at(key) {
            return format!("{} {}", key, quote(id));
        }
    }
    format!("#{}", position)
}

/// Set-scan outcome listing every offender
pub(crate) fn scan_finding(offenders: &[String], found: &str, clean: &str) -> Finding {
    if offenders.is_empty() {
        Finding::compliant(clean)
    } else {
        Finding::offenders(format!("{} {}", offenders.len(), found), offenders.to_vec())
    }
}

/// SNMP counts as on when a read-only community is configured
pub(crate) fn snmp_enabled(model: &ConfigurationModel) -> bool {
    model.value("snmpd/rocommunity").is_some()
}

/// Comma-separated list membership, case-insensitive
pub(crate) fn list_contains(list: &str, wanted: &str) -> bool {
    list.split(',').any(|item| item.trim().eq_ignore_ascii_case(wanted))
}
