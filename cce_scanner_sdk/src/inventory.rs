//! # Device Inventory
//!
//! TOML file listing devices for batch runs. Settings in `[defaults]` apply
//! to every `[[device]]` that does not override them; anything still unset
//! falls back to the `CCE_*` environment preferences.
//!
//! ```toml
//! [defaults]
//! username = "audit"
//! credential = { type = "file", private_key = "/etc/cce/id_ed25519" }
//!
//! [[device]]
//! id = "edge-fw"
//! host = "192.0.2.10"
//!
//! [[device]]
//! id = "lab-fw"
//! host = "198.51.100.7"
//! port = 2222
//! host_key_policy = "disabled"
//! ```

use cce_parser::config::TransportPreferences;
use cce_scanner_base::api::BatchJob;
use cce_scanner_base::transport::{ConnectionDescriptor, HostKeyPolicy, KeyCredential};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Cannot read inventory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid inventory: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Inventory lists no devices")]
    Empty,

    #[error("Device '{device}' has no {field}")]
    MissingField { device: String, field: &'static str },

    #[error("Device id '{device}' appears more than once")]
    DuplicateDevice { device: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceDefaults {
    pub username: Option<String>,
    pub port: Option<u16>,
    pub credential: Option<KeyCredential>,
    pub timeout_secs: Option<u64>,
    pub known_hosts: Option<PathBuf>,
    pub host_key_policy: Option<HostKeyPolicy>,
    pub remote_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceEntry {
    pub id: String,
    pub host: String,
    pub username: Option<String>,
    pub port: Option<u16>,
    pub credential: Option<KeyCredential>,
    pub timeout_secs: Option<u64>,
    pub known_hosts: Option<PathBuf>,
    pub host_key_policy: Option<HostKeyPolicy>,
    pub remote_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inventory {
    #[serde(default)]
    pub defaults: DeviceDefaults,
    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceEntry>,
}

impl Inventory {
    pub fn from_file(path: &Path) -> Result<Self, InventoryError> {
        let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, InventoryError> {
        Ok(toml::from_str(text)?)
    }

    /// One batch job per device, defaults and preferences applied
    pub fn jobs(&self) -> Result<Vec<BatchJob>, InventoryError> {
        self.jobs_with_preferences(&TransportPreferences::default())
    }

    pub fn jobs_with_preferences(
        &self,
        preferences: &TransportPreferences,
    ) -> Result<Vec<BatchJob>, InventoryError> {
        if self.devices.is_empty() {
            return Err(InventoryError::Empty);
        }

        let mut seen = HashSet::new();
        let mut jobs = Vec::with_capacity(self.devices.len());
        for device in &self.devices {
            if !seen.insert(device.id.as_str()) {
                return Err(InventoryError::DuplicateDevice {
                    device: device.id.clone(),
                });
            }
            jobs.push(self.job(device, preferences)?);
        }
        Ok(jobs)
    }

    fn job(
        &self,
        device: &DeviceEntry,
        preferences: &TransportPreferences,
    ) -> Result<BatchJob, InventoryError> {
        let defaults = &self.defaults;
        let missing = |field| InventoryError::MissingField {
            device: device.id.clone(),
            field,
        };

        let username = device
            .username
            .as_ref()
            .or(defaults.username.as_ref())
            .ok_or_else(|| missing("username"))?;
        let credential = device
            .credential
            .clone()
            .or_else(|| defaults.credential.clone())
            .ok_or_else(|| missing("credential"))?;

        let mut descriptor = ConnectionDescriptor::new(&device.id, &device.host, username, credential)
            .with_timeout(
                device
                    .timeout_secs
                    .or(defaults.timeout_secs)
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| preferences.timeout()),
            )
            .with_host_key_policy(
                device
                    .host_key_policy
                    .or(defaults.host_key_policy)
                    .unwrap_or(if preferences.host_key_check {
                        HostKeyPolicy::Strict
                    } else {
                        HostKeyPolicy::Disabled
                    }),
            );
        if let Some(port) = device.port.or(defaults.port) {
            descriptor = descriptor.with_port(port);
        }
        if let Some(path) = device
            .known_hosts
            .as_ref()
            .or(defaults.known_hosts.as_ref())
            .or(preferences.known_hosts_path.as_ref())
        {
            descriptor = descriptor.with_known_hosts(path);
        }

        let remote_path = device
            .remote_path
            .clone()
            .or_else(|| defaults.remote_path.clone())
            .unwrap_or_else(|| preferences.remote_config_path.clone());
        Ok(BatchJob::new(descriptor, remote_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn preferences() -> TransportPreferences {
        TransportPreferences {
            timeout_secs: 30,
            host_key_check: true,
            known_hosts_path: None,
            remote_config_path: "/conf/config.xml".to_string(),
        }
    }

    const INVENTORY: &str = r#"
[defaults]
username = "audit"
credential = { type = "file", private_key = "/etc/cce/id_ed25519" }
timeout_secs = 20

[[device]]
id = "edge-fw"
host = "192.0.2.10"

[[device]]
id = "lab-fw"
host = "198.51.100.7"
port = 2222
username = "labaudit"
credential = { type = "agent" }
host_key_policy = "disabled"
remote_path = "/cf/conf/config.xml"
"#;

    #[test]
    fn test_defaults_and_overrides() {
        let jobs = Inventory::parse(INVENTORY)
            .unwrap()
            .jobs_with_preferences(&preferences())
            .unwrap();
        assert_eq!(jobs.len(), 2);

        let edge = &jobs[0];
        assert_eq!(edge.descriptor.device_id, "edge-fw");
        assert_eq!(edge.descriptor.username, "audit");
        assert_eq!(edge.descriptor.port, 22);
        assert_eq!(edge.descriptor.timeout, Duration::from_secs(20));
        assert_eq!(edge.descriptor.host_key_policy, HostKeyPolicy::Strict);
        assert_eq!(
            edge.descriptor.credential,
            KeyCredential::key_file("/etc/cce/id_ed25519")
        );
        assert_eq!(edge.remote_path, "/conf/config.xml");

        let lab = &jobs[1];
        assert_eq!(lab.descriptor.port, 2222);
        assert_eq!(lab.descriptor.username, "labaudit");
        assert_eq!(lab.descriptor.credential, KeyCredential::Agent);
        assert_eq!(lab.descriptor.host_key_policy, HostKeyPolicy::Disabled);
        assert_eq!(lab.remote_path, "/cf/conf/config.xml");
    }

    #[test]
    fn test_missing_credential() {
        let inventory = Inventory::parse(
            r#"
[[device]]
id = "fw"
host = "192.0.2.1"
username = "audit"
"#,
        )
        .unwrap();
        assert_matches!(
            inventory.jobs_with_preferences(&preferences()),
            Err(InventoryError::MissingField { field: "credential", .. })
        );
    }

    #[test]
    fn test_duplicate_and_empty() {
        let duplicate = format!(
            "{}\n[[device]]\nid = \"edge-fw\"\nhost = \"192.0.2.11\"\n",
            INVENTORY
        );
        assert_matches!(
            Inventory::parse(&duplicate).unwrap().jobs_with_preferences(&preferences()),
            Err(InventoryError::DuplicateDevice { .. })
        );
        assert_matches!(
            Inventory::parse("[defaults]\nusername = \"a\"\n").unwrap().jobs(),
            Err(InventoryError::Empty)
        );
    }

    #[test]
    fn test_no_password_field_accepted() {
        assert_matches!(
            Inventory::parse(
                "[[device]]\nid = \"fw\"\nhost = \"h\"\npassword = \"hunter2\"\n"
            ),
            Err(InventoryError::Parse(_))
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INVENTORY.as_bytes()).unwrap();
        let inventory = Inventory::from_file(file.path()).unwrap();
        assert_eq!(inventory.devices.len(), 2);

        assert_matches!(
            Inventory::from_file(Path::new("/nonexistent/inventory.toml")),
            Err(InventoryError::Io { .. })
        );
    }
}
