use crate::backend::{Compute, Connector};
use crate::config::Config;
use crate::error::ProviderError;

pub async fn run<C: Connector>(config: &Config, connector: &C) -> Result<(), ProviderError> {
    let client = connector.open(&config.project, &config.zone).await?;
    let result = client.start(&config.machine_id).await;
    client.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{Call, FakeConnector, config, opened};

    #[tokio::test]
    async fn starts_the_configured_instance_once() {
        let dir = tempfile::tempdir().unwrap();
        let connector = FakeConnector::new();

        run(&config(dir.path()), &connector).await.unwrap();

        assert_eq!(
            connector.calls(),
            vec![opened(), Call::Start("devpod-ws1".into()), Call::Close]
        );
    }

    #[tokio::test]
    async fn failure_propagates_without_further_calls() {
        let dir = tempfile::tempdir().unwrap();
        let connector = FakeConnector::failing("HTTP 403 Forbidden");

        let err = run(&config(dir.path()), &connector).await.unwrap_err();

        assert_eq!(err.to_string(), "start instance: HTTP 403 Forbidden");
        assert_eq!(
            connector.calls(),
            vec![opened(), Call::Start("devpod-ws1".into()), Call::Close]
        );
    }
}
