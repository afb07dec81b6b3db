//! Body of the `instances.insert` call used by `create`.
//!
//! Paths are qualified with the configured project and zone; the boot disk
//! and network interface follow what the console's "create instance" form
//! sends by default.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::Config;
use crate::ssh::SSH_USER;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRequest {
    pub name: String,
    pub machine_type: String,
    pub disks: Vec<Disk>,
    pub network_interfaces: Vec<NetworkInterface>,
    pub metadata: Metadata,
    pub labels: HashMap<String, String>,
    pub scheduling: Scheduling,
    pub tags: Tags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub auto_delete: bool,
    pub boot: bool,
    pub device_name: String,
    pub initialize_params: InitializeParams,
    pub mode: String,
    #[serde(rename = "type")]
    pub disk_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub disk_size_gb: String,
    pub disk_type: String,
    pub source_image: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub access_configs: Vec<AccessConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    pub stack_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
    pub name: String,
    pub network_tier: String,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Serialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheduling {
    pub automatic_restart: bool,
    pub on_host_maintenance: String,
}

#[derive(Debug, Serialize)]
pub struct Tags {
    pub items: Vec<String>,
}

/// Build the insert request for `config.machine_id`, authorising
/// `public_key` for the provider's SSH user.
pub fn instance_request(config: &Config, public_key: &str) -> InstanceRequest {
    let project = &config.project;
    let zone = &config.zone;
    let name = &config.machine_id;

    let mut labels = HashMap::new();
    labels.insert("devpod-machine".to_string(), label_value(name));

    InstanceRequest {
        name: name.clone(),
        machine_type: format!(
            "projects/{project}/zones/{zone}/machineTypes/{}",
            config.machine_type
        ),
        disks: vec![Disk {
            auto_delete: true,
            boot: true,
            device_name: name.clone(),
            initialize_params: InitializeParams {
                disk_size_gb: config.disk_size_gb.to_string(),
                disk_type: format!("projects/{project}/zones/{zone}/diskTypes/pd-balanced"),
                source_image: config.disk_image.clone(),
            },
            mode: "READ_WRITE".to_string(),
            disk_type: "PERSISTENT".to_string(),
        }],
        network_interfaces: vec![NetworkInterface {
            access_configs: vec![AccessConfig {
                name: "External NAT".to_string(),
                network_tier: "PREMIUM".to_string(),
            }],
            network: config
                .network
                .as_deref()
                .map(|n| qualify(n, &format!("projects/{project}/global/networks"))),
            subnetwork: config.subnetwork.as_deref().map(|s| {
                qualify(
                    s,
                    &format!("projects/{project}/regions/{}/subnetworks", config.region()),
                )
            }),
            stack_type: "IPV4_ONLY".to_string(),
        }],
        metadata: Metadata {
            items: vec![MetadataItem {
                key: "ssh-keys".to_string(),
                value: format!("{SSH_USER}:{}", public_key.trim_end()),
            }],
        },
        labels,
        scheduling: Scheduling {
            automatic_restart: true,
            on_host_maintenance: "MIGRATE".to_string(),
        },
        tags: Tags {
            items: vec!["devpod".to_string()],
        },
    }
}

/// Accept either a bare resource name or an already qualified path.
fn qualify(value: &str, collection: &str) -> String {
    if value.contains('/') {
        value.to_string()
    } else {
        format!("{collection}/{value}")
    }
}

// Label values: lowercase letters, digits, '-' and '_', at most 63 chars.
fn label_value(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .take(63)
        .collect()
}
