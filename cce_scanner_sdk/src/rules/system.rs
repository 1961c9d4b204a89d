//! System settings rules (section 1)

use cce_parser::ConfigurationModel;
use cce_scanner_base::results::evidence::quote;
use cce_scanner_base::rules::{Category, Finding, RegistryError, RuleDefinition, RuleFault};

pub fn definitions() -> Result<Vec<RuleDefinition>, RegistryError> {
    Ok(vec![
        RuleDefinition::new("1.4", "Ensure hostname is set", Category::System, hostname_set)?,
        RuleDefinition::new(
            "1.5",
            "Ensure DNS server is configured",
            Category::System,
            dns_servers_configured,
        )?,
        RuleDefinition::new(
            "1.6",
            "Ensure IPv6 is disabled if not used",
            Category::System,
            wan_ipv4_only,
        )?,
        RuleDefinition::new(
            "1.8",
            "Ensure web management is set to HTTPS",
            Category::System,
            webgui_https,
        )?,
        RuleDefinition::new(
            "1.10",
            "Ensure NTP is configured and enabled",
            Category::System,
            ntp_configured,
        )?,
    ])
}

fn hostname_set(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    Ok(match model.value("system/hostname") {
        Some(hostname) => Finding::compliant(format!("Hostname set to {}.", quote(hostname))),
        None => Finding::non_compliant("Hostname is not set."),
    })
}

fn dns_servers_configured(
    model: &ConfigurationModel,
    _: &RuleDefinition,
) -> Result<Finding, RuleFault> {
    let entries = model.all("system/dnsserver");
    if entries.is_empty() {
        return Ok(Finding::non_compliant("No DNS servers defined in system/dnsserver."));
    }

    let servers: Vec<String> = entries
        .iter()
        .filter_map(|node| node.value())
        .map(quote)
        .collect();
    Ok(if servers.is_empty() {
        Finding::non_compliant("system/dnsserver entries present but empty.")
    } else {
        Finding::compliant(format!("DNS servers configured: {}", servers.join(", ")))
    })
}

fn wan_ipv4_only(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    if model.lookup("interfaces/wan").is_absent() {
        return Ok(Finding::not_applicable("No WAN interface defined."));
    }
    let Some(protocol) = model.value("interfaces/wan/ipprotocol") else {
        return Ok(Finding::not_reviewed(
            "No ipprotocol value for the WAN interface; verify IPv6 usage manually.",
        ));
    };

    Ok(match protocol.to_ascii_lowercase().as_str() {
        "inet" | "ipv4" => Finding::compliant(format!("WAN ipprotocol is {}, IPv4-only.", quote(protocol))),
        _ => Finding::non_compliant(format!(
            "WAN ipprotocol is {} (IPv6 or dual-stack enabled).",
            quote(protocol)
        )),
    })
}

fn webgui_https(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    Ok(match model.value("system/webgui/protocol") {
        Some(protocol) if protocol.eq_ignore_ascii_case("https") => {
            Finding::compliant("WebGUI protocol is HTTPS.")
        }
        Some(protocol) => Finding::non_compliant(format!(
            "WebGUI protocol is {} (expected HTTPS).",
            quote(protocol)
        )),
        None => Finding::non_compliant("WebGUI protocol is not set (expected HTTPS)."),
    })
}

fn ntp_configured(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    let Some(servers) = model.value("system/timeservers") else {
        return Ok(Finding::non_compliant(
            "No NTP time servers defined under system/timeservers.",
        ));
    };

    Ok(if model.flag("ntpd/enable").is_enabled() {
        Finding::compliant(format!("NTP enabled with time servers {}.", quote(servers)))
    } else {
        Finding::non_compliant(format!(
            "NTP time servers configured ({}) but ntpd is not enabled.",
            quote(servers)
        ))
    })
}
