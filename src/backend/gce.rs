//! Compute Engine v1 REST client.

use std::path::PathBuf;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::backend::auth;
use crate::backend::types::{Instance, InstanceStatus, Operation};
use crate::backend::{Compute, Connector, InstanceRequest};
use crate::error::ProviderError;

pub const GCE_API_BASE: &str = "https://compute.googleapis.com/compute/v1";

// Polls of zoneOperations.wait before giving up; each call blocks for up to
// two minutes server-side.
const MAX_OPERATION_WAITS: usize = 30;

/// Opens authenticated [`GceClient`]s from a credentials file.
pub struct GceConnector {
    credentials: PathBuf,
}

impl GceConnector {
    pub fn new(credentials: PathBuf) -> Self {
        Self { credentials }
    }
}

impl Connector for GceConnector {
    type Client = GceClient;

    async fn open(&self, project: &str, zone: &str) -> Result<GceClient, ProviderError> {
        let credentials = auth::load_credentials(&self.credentials)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("gce-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::compute("build http client", e))?;
        let token = auth::access_token(&http, &credentials).await?;
        tracing::debug!(project, zone, "compute client opened");
        Ok(GceClient {
            http,
            token,
            project: project.to_string(),
            zone: zone.to_string(),
            base: GCE_API_BASE.to_string(),
        })
    }
}

/// A compute handle bound to one project and zone.
pub struct GceClient {
    http: reqwest::Client,
    token: String,
    project: String,
    zone: String,
    base: String,
}

impl GceClient {
    fn zone_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/zones/{}/{path}",
            self.base, self.project, self.zone
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        stage: &str,
        builder: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::compute(stage, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::compute(stage, format!("HTTP {status}: {body}")));
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::compute(stage, e))
    }

    /// Issue a mutating call and block until its operation is done.
    async fn run_operation(
        &self,
        stage: &str,
        builder: RequestBuilder,
    ) -> Result<(), ProviderError> {
        let operation: Operation = self.send(stage, builder).await?;
        tracing::debug!(operation = %operation.name, status = %operation.status, "{stage} accepted");
        self.wait(stage, operation).await
    }

    async fn wait(&self, stage: &str, mut operation: Operation) -> Result<(), ProviderError> {
        for _ in 0..MAX_OPERATION_WAITS {
            if operation.is_done() {
                return match operation.failure() {
                    Some(message) => Err(ProviderError::compute(stage, message)),
                    None => Ok(()),
                };
            }
            let url = self.zone_url(&format!("operations/{}/wait", operation.name));
            operation = self
                .send(stage, self.request(Method::POST, &url))
                .await?;
        }
        Err(ProviderError::compute(
            stage,
            format!("operation {} did not finish", operation.name),
        ))
    }

    async fn get(&self, name: &str) -> Result<Option<Instance>, ProviderError> {
        let url = self.zone_url(&format!("instances/{name}"));
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| ProviderError::compute("get instance", e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::compute(
                "get instance",
                format!("HTTP {status}: {body}"),
            ));
        }
        response
            .json()
            .await
            .map(Some)
            .map_err(|e| ProviderError::compute("get instance", e))
    }
}

impl Compute for GceClient {
    async fn create(&self, request: &InstanceRequest) -> Result<(), ProviderError> {
        tracing::info!(instance = %request.name, zone = %self.zone, "creating instance");
        let url = self.zone_url("instances");
        self.run_operation("create instance", self.request(Method::POST, &url).json(request))
            .await
    }

    async fn delete(&self, name: &str) -> Result<(), ProviderError> {
        tracing::info!(instance = name, zone = %self.zone, "deleting instance");
        let url = self.zone_url(&format!("instances/{name}"));
        self.run_operation("delete instance", self.request(Method::DELETE, &url))
            .await
    }

    async fn start(&self, name: &str) -> Result<(), ProviderError> {
        tracing::info!(instance = name, zone = %self.zone, "starting instance");
        let url = self.zone_url(&format!("instances/{name}/start"));
        self.run_operation("start instance", self.request(Method::POST, &url))
            .await
    }

    async fn stop(&self, name: &str) -> Result<(), ProviderError> {
        tracing::info!(instance = name, zone = %self.zone, "stopping instance");
        let url = self.zone_url(&format!("instances/{name}/stop"));
        self.run_operation("stop instance", self.request(Method::POST, &url))
            .await
    }

    async fn status(&self, name: &str) -> Result<InstanceStatus, ProviderError> {
        Ok(match self.get(name).await? {
            Some(instance) => InstanceStatus::from_api(&instance.status),
            None => InstanceStatus::NotFound,
        })
    }

    async fn external_ip(&self, name: &str) -> Result<String, ProviderError> {
        let instance = self.get(name).await?.ok_or_else(|| {
            ProviderError::compute("get instance", format!("instance {name} not found"))
        })?;
        instance
            .external_ip()
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::compute(
                    "get instance",
                    format!("instance {name} has no external IP"),
                )
            })
    }

    fn close(self) {
        tracing::debug!(project = %self.project, zone = %self.zone, "compute client closed");
    }
}
