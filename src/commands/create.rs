use crate::backend::request::instance_request;
use crate::backend::{Compute, Connector};
use crate::config::Config;
use crate::error::ProviderError;
use crate::ssh::keys;

/// Create the instance with the machine folder's public key authorised for
/// SSH. The key pair is bootstrapped first if it does not exist yet.
pub async fn run<C: Connector>(config: &Config, connector: &C) -> Result<(), ProviderError> {
    let public_key = keys::public_key(&config.machine_folder)?;
    let request = instance_request(config, &public_key);

    let client = connector.open(&config.project, &config.zone).await?;
    let result = client.create(&request).await;
    client.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{Call, FakeConnector, config, opened};
    use crate::paths;

    #[tokio::test]
    async fn creates_the_configured_instance_once() {
        let dir = tempfile::tempdir().unwrap();
        let connector = FakeConnector::new();

        run(&config(dir.path()), &connector).await.unwrap();

        assert_eq!(
            connector.calls(),
            vec![
                opened(),
                Call::Create {
                    name: "devpod-ws1".into(),
                    machine_type: "projects/my-project/zones/us-central1-a/machineTypes/c2-standard-4"
                        .into(),
                },
                Call::Close,
            ]
        );
        assert!(paths::private_key_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn failure_propagates_without_further_calls() {
        let dir = tempfile::tempdir().unwrap();
        let connector = FakeConnector::failing("QUOTA_EXCEEDED: no CPUs");

        let err = run(&config(dir.path()), &connector).await.unwrap_err();

        assert_eq!(err.to_string(), "create instance: QUOTA_EXCEEDED: no CPUs");
        assert_eq!(connector.calls().len(), 3);
        assert_eq!(connector.calls().last(), Some(&Call::Close));
    }

    #[tokio::test]
    async fn unreadable_public_key_stops_before_opening() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(paths::private_key_path(dir.path()), "existing").unwrap();
        let connector = FakeConnector::new();

        let err = run(&config(dir.path()), &connector).await.unwrap_err();

        assert!(matches!(err, ProviderError::Keys { .. }), "{err}");
        assert!(connector.calls().is_empty());
    }
}
