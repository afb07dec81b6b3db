use crate::backend::{Compute, Connector, InstanceStatus};
use crate::config::Config;
use crate::error::ProviderError;

pub async fn run<C: Connector>(
    config: &Config,
    connector: &C,
) -> Result<InstanceStatus, ProviderError> {
    let client = connector.open(&config.project, &config.zone).await?;
    let result = client.status(&config.machine_id).await;
    client.close();
    result
}
