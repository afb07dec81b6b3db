use crate::backend::{Compute, Connector};
use crate::config::Config;
use crate::error::ProviderError;

pub async fn run<C: Connector>(config: &Config, connector: &C) -> Result<(), ProviderError> {
    let client = connector.open(&config.project, &config.zone).await?;
    let result = client.delete(&config.machine_id).await;
    client.close();
    result
}
