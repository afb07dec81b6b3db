//! Recording fake for the compute seam.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::backend::{Compute, Connector, InstanceRequest, InstanceStatus};
use crate::config::Config;
use crate::error::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open { project: String, zone: String },
    Create { name: String, machine_type: String },
    Delete(String),
    Start(String),
    Stop(String),
    Status(String),
    ExternalIp(String),
    Close,
}

#[derive(Clone, Default)]
pub struct FakeConnector {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_with: Option<String>,
    fail_open: bool,
    status: Option<InstanceStatus>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every compute operation fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn with_status(status: InstanceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct FakeClient {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_with: Option<String>,
    status: Option<InstanceStatus>,
}

impl FakeClient {
    fn record(&self, call: Call, stage: &str) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(message) => Err(ProviderError::compute(stage, message)),
            None => Ok(()),
        }
    }
}

impl Connector for FakeConnector {
    type Client = FakeClient;

    async fn open(&self, project: &str, zone: &str) -> Result<FakeClient, ProviderError> {
        self.calls.lock().unwrap().push(Call::Open {
            project: project.to_string(),
            zone: zone.to_string(),
        });
        if self.fail_open {
            return Err(ProviderError::Auth {
                stage: "request access token".into(),
                message: "HTTP 401 Unauthorized".into(),
            });
        }
        Ok(FakeClient {
            calls: Arc::clone(&self.calls),
            fail_with: self.fail_with.clone(),
            status: self.status,
        })
    }
}

impl Compute for FakeClient {
    async fn create(&self, request: &InstanceRequest) -> Result<(), ProviderError> {
        self.record(
            Call::Create {
                name: request.name.clone(),
                machine_type: request.machine_type.clone(),
            },
            "create instance",
        )
    }

    async fn delete(&self, name: &str) -> Result<(), ProviderError> {
        self.record(Call::Delete(name.to_string()), "delete instance")
    }

    async fn start(&self, name: &str) -> Result<(), ProviderError> {
        self.record(Call::Start(name.to_string()), "start instance")
    }

    async fn stop(&self, name: &str) -> Result<(), ProviderError> {
        self.record(Call::Stop(name.to_string()), "stop instance")
    }

    async fn status(&self, name: &str) -> Result<InstanceStatus, ProviderError> {
        self.record(Call::Status(name.to_string()), "get instance")?;
        Ok(self.status.unwrap_or(InstanceStatus::Running))
    }

    async fn external_ip(&self, name: &str) -> Result<String, ProviderError> {
        self.record(Call::ExternalIp(name.to_string()), "get instance")?;
        Ok("127.0.0.1".to_string())
    }

    fn close(self) {
        self.calls.lock().unwrap().push(Call::Close);
    }
}

pub fn config(machine_folder: &Path) -> Config {
    Config::from_lookup(|key| match key {
        "PROJECT" => Some("my-project".into()),
        "ZONE" => Some("us-central1-a".into()),
        "MACHINE_ID" => Some("devpod-ws1".into()),
        "MACHINE_FOLDER" => Some(machine_folder.display().to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn opened() -> Call {
    Call::Open {
        project: "my-project".into(),
        zone: "us-central1-a".into(),
    }
}
