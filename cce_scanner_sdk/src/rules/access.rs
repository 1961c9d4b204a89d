//! Access control rules (section 2)

use cce_parser::ConfigurationModel;
use cce_scanner_base::results::evidence::quote;
use cce_scanner_base::rules::{
    Category, Finding, RegistryError, RuleDefinition, RuleFault, ThresholdOperator,
};

const SESSION_TIMEOUT_PATH: &str = "system/webgui/session_timeout";

pub fn definitions() -> Result<Vec<RuleDefinition>, RegistryError> {
    Ok(vec![
        RuleDefinition::new(
            "2.1",
            "Ensure sessions timeout is set to 10 minutes or less",
            Category::Access,
            session_timeout,
        )?
        .with_threshold(ThresholdOperator::Le, 10, "minutes"),
        RuleDefinition::new(
            "2.2",
            "Ensure LDAP or RADIUS authentication server is configured",
            Category::Access,
            auth_servers_configured,
        )?,
    ])
}

fn session_timeout(model: &ConfigurationModel, rule: &RuleDefinition) -> Result<Finding, RuleFault> {
    let threshold = rule.threshold()?;
    let Some(raw) = model.value(SESSION_TIMEOUT_PATH) else {
        return Ok(Finding::non_compliant(format!(
            "No webgui session timeout set; {}.",
            threshold.describe()
        )));
    };
    let minutes: i64 = raw.parse().map_err(|_| {
        RuleFault::unexpected_shape(SESSION_TIMEOUT_PATH, format!("{} is not an integer", quote(raw)))
    })?;

    // pfSense treats 0 as "never expire"
    if minutes == 0 {
        return Ok(Finding::non_compliant(format!(
            "Session timeout is 0 (sessions never expire); {}.",
            threshold.describe()
        )));
    }

    let evidence = format!(
        "Session timeout set to {} minutes; {}.",
        minutes,
        threshold.describe()
    );
    Ok(if threshold.holds(minutes) {
        Finding::compliant(evidence)
    } else {
        Finding::non_compliant(evidence)
    })
}

fn auth_servers_configured(
    model: &ConfigurationModel,
    _: &RuleDefinition,
) -> Result<Finding, RuleFault> {
    let servers = model.all("system/authserver");
    if servers.is_empty() {
        return Ok(Finding::non_compliant(
            "No LDAP/RADIUS authentication servers configured.",
        ));
    }

    let names: Vec<String> = servers
        .iter()
        .filter_map(|server| server.value_at("name").or_else(|| server.value_at("description")))
        .map(quote)
        .collect();
    Ok(if names.is_empty() {
        Finding::compliant(format!(
            "{} authentication server(s) configured.",
            servers.len()
        ))
    } else {
        Finding::compliant(format!(
            "Authentication servers configured: {}",
            names.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::verdict;
    use cce_scanner_base::results::VerdictStatus;

    fn timeout(value: &str) -> String {
        format!(
            "<pfsense><system><webgui><session_timeout>{}</session_timeout></webgui></system></pfsense>",
            value
        )
    }

    #[test]
    fn test_session_timeout_threshold() {
        let v = verdict(definitions().unwrap(), "2.1", &timeout("10"));
        assert_eq!(v.status(), VerdictStatus::Compliant);

        let v = verdict(definitions().unwrap(), "2.1", &timeout("240"));
        assert_eq!(v.status(), VerdictStatus::NonCompliant);
        let evidence = v.evidence().unwrap();
        assert!(evidence.contains("240 minutes"));
        assert!(evidence.contains("expected <= 10 minutes"));
    }

    #[test]
    fn test_session_timeout_zero_never_expires() {
        let v = verdict(definitions().unwrap(), "2.1", &timeout("0"));
        assert_eq!(v.status(), VerdictStatus::NonCompliant);
        assert!(v.evidence().unwrap().contains("never expire"));
    }

    #[test]
    fn test_session_timeout_garbage_is_not_reviewed() {
        let v = verdict(definitions().unwrap(), "2.1", &timeout("ten"));
        assert_eq!(v.status(), VerdictStatus::NotReviewed);
        assert!(v.evidence().unwrap().contains("'ten'"));
    }

    #[test]
    fn test_session_timeout_missing() {
        let v = verdict(definitions().unwrap(), "2.1", "<pfsense><system/></pfsense>");
        assert_eq!(v.status(), VerdictStatus::NonCompliant);
    }

    #[test]
    fn test_auth_servers() {
        let v = verdict(
            definitions().unwrap(),
            "2.2",
            "<pfsense><system><authserver><name>corp-ldap</name></authserver>\
             <authserver><description>radius</description></authserver></system></pfsense>",
        );
        assert_eq!(v.status(), VerdictStatus::Compliant);
        assert!(v.evidence().unwrap().contains("'corp-ldap', 'radius'"));

        let v = verdict(definitions().unwrap(), "2.2", "<pfsense><system/></pfsense>");
        assert_eq!(v.status(), VerdictStatus::NonCompliant);
    }
}
