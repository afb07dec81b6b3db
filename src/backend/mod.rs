pub mod auth;
pub mod gce;
pub mod request;
pub mod types;

use crate::error::ProviderError;

pub use request::InstanceRequest;
pub use types::InstanceStatus;

/// Opens compute handles scoped to one project and zone.
#[allow(async_fn_in_trait)] // trait is internal-only
pub trait Connector {
    type Client: Compute;

    async fn open(&self, project: &str, zone: &str) -> Result<Self::Client, ProviderError>;
}

/// Instance operations against one {project, zone}.
///
/// Mutating calls return once the provider reports the operation done.
#[allow(async_fn_in_trait)]
pub trait Compute {
    async fn create(&self, request: &InstanceRequest) -> Result<(), ProviderError>;
    async fn delete(&self, name: &str) -> Result<(), ProviderError>;
    async fn start(&self, name: &str) -> Result<(), ProviderError>;
    async fn stop(&self, name: &str) -> Result<(), ProviderError>;
    async fn status(&self, name: &str) -> Result<InstanceStatus, ProviderError>;
    async fn external_ip(&self, name: &str) -> Result<String, ProviderError>;

    /// Release the handle.
    fn close(self);
}
