//! VPN rules (sections 5.4 and 5.5)
//!
//! OpenVPN servers live under `openvpn/openvpn-server`, IPsec tunnels under
//! `ipsec/phase1`. Rules are not applicable when neither is configured.

use super::{list_contains, offender_label, scan_finding};
use cce_parser::{ConfigNode, ConfigurationModel};
use cce_scanner_base::results::evidence::quote;
use cce_scanner_base::rules::{Category, Finding, RegistryError, RuleDefinition, RuleFault};

/// Ciphers and digests OpenVPN servers must not offer
pub const FORBIDDEN_OPENVPN_ALGORITHMS: &[&str] = &[
    "BF-CBC",
    "DES-CBC",
    "DES-EDE3-CBC",
    "DES-EDE-CBC",
    "RC2-CBC",
    "CAST5-CBC",
    "none",
    "MD5",
    "SHA1",
];

/// Fields holding a cipher or digest list
const ALGORITHM_FIELDS: [&str; 4] = ["data_ciphers", "data_ciphers_fallback", "crypto", "digest"];

const LOCAL_DATABASE: &str = "Local Database";

pub fn definitions() -> Result<Vec<RuleDefinition>, RegistryError> {
    Ok(vec![
        RuleDefinition::new(
            "5.4.1",
            "Ensure VPN authentication uses RADIUS or LDAP",
            Category::Vpn,
            external_authentication,
        )?,
        RuleDefinition::new(
            "5.4.2",
            "Ensure VPN endpoints use a signed certificate",
            Category::Vpn,
            server_certificates,
        )?,
        RuleDefinition::new(
            "5.4.3",
            "Ensure OpenVPN servers use a TLS key",
            Category::Vpn,
            tls_keys,
        )?,
        RuleDefinition::new(
            "5.5.1",
            "Ensure OpenVPN servers use strong ciphers and digests",
            Category::Vpn,
            strong_algorithms,
        )?
        .with_forbidden(FORBIDDEN_OPENVPN_ALGORITHMS),
    ])
}

fn openvpn_servers(model: &ConfigurationModel) -> Vec<&ConfigNode> {
    model.all("openvpn/openvpn-server")
}

fn ipsec_tunnels(model: &ConfigurationModel) -> Vec<&ConfigNode> {
    model.all("ipsec/phase1")
}

/// `kind label (reason)` for every node `offends` returns a reason for
fn labelled(
    nodes: &[&ConfigNode],
    kind: &str,
    offends: impl Fn(&ConfigNode) -> Option<String>,
) -> Vec<String> {
    nodes
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            offends(*node).map(|why| {
                format!("{} {} ({})", kind, offender_label(*node, index + 1), why)
            })
        })
        .collect()
}

// ============================================================================
// EVALUATORS
// ============================================================================

fn external_authentication(
    model: &ConfigurationModel,
    _: &RuleDefinition,
) -> Result<Finding, RuleFault> {
    let servers = openvpn_servers(model);
    let tunnels = ipsec_tunnels(model);
    if servers.is_empty() && tunnels.is_empty() {
        return Ok(Finding::not_applicable(
            "No OpenVPN server or IPsec phase 1 configuration.",
        ));
    }

    let offenders = labelled(&servers, "OpenVPN server", |server| {
        let local_only = server.value_at("authmode").map_or(true, |modes| {
            modes
                .split(',')
                .all(|mode| mode.trim().eq_ignore_ascii_case(LOCAL_DATABASE))
        });
        local_only.then(|| "local database only".to_string())
    });
    if !offenders.is_empty() {
        return Ok(scan_finding(
            &offenders,
            "VPN server(s) do not use RADIUS or LDAP",
            "",
        ));
    }
    if !tunnels.is_empty() {
        return Ok(Finding::not_reviewed(format!(
            "{} IPsec phase 1 tunnel(s) present; verify user authentication uses RADIUS or LDAP.",
            tunnels.len()
        )));
    }
    Ok(Finding::compliant(
        "All OpenVPN servers authenticate against RADIUS or LDAP.",
    ))
}

fn server_certificates(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    let servers = openvpn_servers(model);
    let tunnels = ipsec_tunnels(model);
    if servers.is_empty() && tunnels.is_empty() {
        return Ok(Finding::not_applicable("No VPN endpoint configuration."));
    }

    let mut offenders = labelled(&servers, "OpenVPN server", |server| {
        server
            .value_at("certref")
            .is_none()
            .then(|| "no server certificate".to_string())
    });
    offenders.extend(labelled(&tunnels, "IPsec tunnel", |tunnel| {
        match tunnel.value_at("authentication_method") {
            Some(method) if method.eq_ignore_ascii_case("pre_shared_key") => {
                Some("pre-shared key".to_string())
            }
            _ if tunnel.value_at("certref").is_none() => Some("no certificate".to_string()),
            _ => None,
        }
    }));

    Ok(scan_finding(
        &offenders,
        "VPN endpoint(s) without a signed certificate",
        "All VPN endpoints use a certificate.",
    ))
}

fn tls_keys(model: &ConfigurationModel, _: &RuleDefinition) -> Result<Finding, RuleFault> {
    let servers = openvpn_servers(model);
    if servers.is_empty() {
        return Ok(Finding::not_applicable("No OpenVPN server configuration."));
    }
    let offenders = labelled(&servers, "OpenVPN server", |server| {
        server
            .value_at("tls")
            .is_none()
            .then(|| "no TLS key".to_string())
    });
    Ok(scan_finding(
        &offenders,
        "OpenVPN server(s) without TLS authentication",
        "All OpenVPN servers use a TLS key.",
    ))
}

fn strong_algorithms(model: &ConfigurationModel, rule: &RuleDefinition) -> Result<Finding, RuleFault> {
    let forbidden = rule.forbidden_values()?;
    let servers = openvpn_servers(model);
    if servers.is_empty() {
        return Ok(Finding::not_applicable("No OpenVPN server configuration."));
    }

    let offenders = labelled(&servers, "OpenVPN server", |server| {
        let hits: Vec<String> = ALGORITHM_FIELDS
            .iter()
            .filter_map(|field| {
                let value = server.value_at(field)?;
                let matched: Vec<&str> = forbidden
                    .iter()
                    .copied()
                    .filter(|bad| list_contains(value, bad))
                    .collect();
                (!matched.is_empty()).then(|| format!("{} {}", field, quote(&matched.join(","))))
            })
            .collect();
        (!hits.is_empty()).then(|| hits.join("; "))
    });
    Ok(scan_finding(
        &offenders,
        "OpenVPN server(s) use forbidden algorithms",
        "No OpenVPN server uses a forbidden cipher or digest.",
    ))
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
    fn test_no_vpn_is_not_applicable() {
        for id in ["5.4.1", "5.4.2", "5.4.3", "5.5.1"] {
            assert_eq!(check(id, "<openvpn/>").0, VerdictStatus::NotApplicable);
        }
    }

    #[test]
    fn test_local_database_auth_flagged() {
        let (status, evidence) = check(
            "5.4.1",
            "<openvpn>\
               <openvpn-server><vpnid>1</vpnid><description>Remote</description><authmode>Local Database</authmode></openvpn-server>\
               <openvpn-server><vpnid>2</vpnid><authmode>corp-ldap,Local Database</authmode></openvpn-server>\
               <openvpn-server><vpnid>3</vpnid></openvpn-server>\
             </openvpn>",
        );
        assert_eq!(status, VerdictStatus::NonCompliant);
        assert_eq!(
            evidence,
            "2 VPN server(s) do not use RADIUS or LDAP: OpenVPN server 'Remote' (local database only), \
             OpenVPN server vpnid '3' (local database only)"
        );
    }

    #[test]
    fn test_ipsec_only_needs_review() {
        let (status, _) = check(
            "5.4.1",
            "<ipsec><phase1><ikeid>1</ikeid><authentication_method>cert</authentication_method></phase1></ipsec>",
        );
        assert_eq!(status, VerdictStatus::NotReviewed);
    }

    #[test]
    fn test_certificates() {
        let (status, evidence) = check(
            "5.4.2",
            "<openvpn><openvpn-server><vpnid>1</vpnid><certref>abc</certref></openvpn-server></openvpn>\
             <ipsec>\
               <phase1><ikeid>1</ikeid><authentication_method>pre_shared_key</authentication_method></phase1>\
               <phase1><ikeid>2</ikeid><authentication_method>cert</authentication_method></phase1>\
               <phase1><ikeid>3</ikeid><authentication_method>cert</authentication_method><certref>def</certref></phase1>\
             </ipsec>",
        );
        assert_eq!(status, VerdictStatus::NonCompliant);
        assert!(evidence.starts_with("2 VPN endpoint(s)"));
        assert!(evidence.contains("IPsec tunnel ikeid '1' (pre-shared key)"));
        assert!(evidence.contains("IPsec tunnel ikeid '2' (no certificate)"));
    }

    #[test]
    fn test_tls_key() {
        let (status, _) = check(
            "5.4.3",
            "<openvpn><openvpn-server><tls>a2V5</tls></openvpn-server></openvpn>",
        );
        assert_eq!(status, VerdictStatus::Compliant);
        let (status, evidence) = check(
            "5.4.3",
            "<openvpn><openvpn-server><tls/></openvpn-server></openvpn>",
        );
        assert_eq!(status, VerdictStatus::NonCompliant);
        assert!(evidence.contains("#1"));
    }

    #[test]
    fn test_forbidden_algorithms() {
        let (status, evidence) = check(
            "5.5.1",
            "<openvpn>\
               <openvpn-server><vpnid>1</vpnid><data_ciphers>AES-256-GCM,bf-cbc</data_ciphers><digest>SHA1</digest></openvpn-server>\
               <openvpn-server><vpnid>2</vpnid><data_ciphers>AES-256-GCM</data_ciphers><digest>SHA256</digest></openvpn-server>\
             </openvpn>",
        );
        assert_eq!(status, VerdictStatus::NonCompliant);
        assert_eq!(
            evidence,
            "1 OpenVPN server(s) use forbidden algorithms: OpenVPN server vpnid '1' \
             (data_ciphers 'BF-CBC'; digest 'SHA1')"
        );
    }
}
