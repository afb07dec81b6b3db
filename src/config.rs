use std::path::PathBuf;

use crate::error::ProviderError;
use crate::paths;

pub const DEFAULT_MACHINE_TYPE: &str = "c2-standard-4";
pub const DEFAULT_DISK_SIZE_GB: u64 = 40;
pub const DEFAULT_DISK_IMAGE: &str =
    "projects/ubuntu-os-cloud/global/images/family/ubuntu-2204-lts";

/// Provider options for one invocation, read from the environment the host
/// orchestrator prepares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub project: String,
    pub zone: String,
    pub machine_id: String,
    pub machine_type: String,
    pub disk_size_gb: u64,
    pub disk_image: String,
    pub network: Option<String>,
    pub subnetwork: Option<String>,
    /// Directory holding the SSH key pair and the provider log.
    pub machine_folder: PathBuf,
    /// Path to the service-account JSON used for API authentication.
    pub credentials: PathBuf,
    /// Optional SHA-256 fingerprint the instance's SSH host key must match.
    pub ssh_host_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| ProviderError::Config {
                message: format!("{key} must be set"),
            })
        };

        let project = required("PROJECT")?;
        let zone = required("ZONE")?;
        let machine_id = required("MACHINE_ID")?;
        validate_zone(&zone)?;

        let disk_size_gb = match get("DISK_SIZE") {
            Some(raw) => parse_disk_size(&raw)?,
            None => DEFAULT_DISK_SIZE_GB,
        };

        let machine_folder = get("MACHINE_FOLDER")
            .map(PathBuf::from)
            .unwrap_or_else(|| paths::machine_dir(&machine_id));
        let credentials = get("GOOGLE_APPLICATION_CREDENTIALS")
            .map(PathBuf::from)
            .unwrap_or_else(paths::default_credentials);

        Ok(Self {
            project,
            zone,
            machine_id,
            machine_type: get("MACHINE_TYPE").unwrap_or_else(|| DEFAULT_MACHINE_TYPE.into()),
            disk_size_gb,
            disk_image: get("DISK_IMAGE").unwrap_or_else(|| DEFAULT_DISK_IMAGE.into()),
            network: get("NETWORK"),
            subnetwork: get("SUBNETWORK"),
            machine_folder,
            credentials,
            ssh_host_key: get("SSH_HOST_KEY"),
        })
    }

    /// Region the zone belongs to, e.g. `europe-west1` for `europe-west1-b`.
    pub fn region(&self) -> &str {
        self.zone
            .rsplit_once('-')
            .map(|(prefix, _)| prefix)
            .unwrap_or(&self.zone)
    }
}

fn validate_zone(zone: &str) -> Result<(), ProviderError> {
    if zone.contains('/') || !zone.contains('-') {
        return Err(ProviderError::Config {
            message: format!("ZONE '{zone}' is not a zone name (expected e.g. 'us-central1-a')"),
        });
    }
    Ok(())
}

fn parse_disk_size(raw: &str) -> Result<u64, ProviderError> {
    let size: u64 = raw.parse().map_err(|_| ProviderError::Config {
        message: format!("DISK_SIZE must be a whole number of GB, got '{raw}'"),
    })?;
    if size == 0 {
        return Err(ProviderError::Config {
            message: "DISK_SIZE must be greater than zero".into(),
        });
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("PROJECT", "my-project"),
        ("ZONE", "europe-west1-b"),
        ("MACHINE_ID", "devpod-abc"),
    ];

    #[test]
    fn required_values_and_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.project, "my-project");
        assert_eq!(config.zone, "europe-west1-b");
        assert_eq!(config.machine_id, "devpod-abc");
        assert_eq!(config.machine_type, DEFAULT_MACHINE_TYPE);
        assert_eq!(config.disk_size_gb, DEFAULT_DISK_SIZE_GB);
        assert_eq!(config.disk_image, DEFAULT_DISK_IMAGE);
        assert!(config.network.is_none());
        assert!(config.ssh_host_key.is_none());
        assert!(config.machine_folder.ends_with("devpod-abc"));
    }

    #[test]
    fn missing_machine_id_is_rejected() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("MACHINE_ID must be set"), "{err}");
    }

    #[test]
    fn blank_project_counts_as_missing() {
        let vars = [("PROJECT", "  "), REQUIRED[1], REQUIRED[2]];
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("PROJECT must be set"), "{err}");
    }

    #[test]
    fn overrides_are_applied() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("MACHINE_TYPE", "e2-medium"),
            ("DISK_SIZE", "100"),
            ("MACHINE_FOLDER", "/tmp/keys"),
            ("SUBNETWORK", "dev-subnet"),
            ("SSH_HOST_KEY", "SHA256:abc"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.machine_type, "e2-medium");
        assert_eq!(config.disk_size_gb, 100);
        assert_eq!(config.machine_folder, PathBuf::from("/tmp/keys"));
        assert_eq!(config.subnetwork.as_deref(), Some("dev-subnet"));
        assert_eq!(config.ssh_host_key.as_deref(), Some("SHA256:abc"));
    }

    #[test]
    fn invalid_disk_size_is_rejected() {
        for bad in ["forty", "0", "-5"] {
            let mut vars = REQUIRED.to_vec();
            vars.push(("DISK_SIZE", bad));
            let err = Config::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, ProviderError::Config { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn zone_path_is_rejected() {
        let vars = [
            REQUIRED[0],
            ("ZONE", "projects/p/zones/us-east1-b"),
            REQUIRED[2],
        ];
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn region_is_derived_from_zone() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.region(), "europe-west1");
    }
}
