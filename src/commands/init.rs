use crate::backend::{Compute, Connector};
use crate::config::Config;
use crate::error::ProviderError;
use crate::ssh::keys::{self, Bootstrap};

/// Bootstrap the key pair and check that the credentials can open a compute
/// handle. Nothing is mutated remotely.
pub async fn run<C: Connector>(config: &Config, connector: &C) -> Result<Bootstrap, ProviderError> {
    let bootstrap = keys::ensure_key_pair(&config.machine_folder)?;
    tracing::info!(
        dir = %config.machine_folder.display(),
        ?bootstrap,
        "SSH key pair ready"
    );

    let client = connector.open(&config.project, &config.zone).await?;
    client.close();
    Ok(bootstrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{Call, FakeConnector, config, opened};

    #[tokio::test]
    async fn bootstraps_keys_and_checks_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let connector = FakeConnector::new();
        let config = config(dir.path());

        assert_eq!(run(&config, &connector).await.unwrap(), Bootstrap::Generated);
        assert_eq!(run(&config, &connector).await.unwrap(), Bootstrap::Existing);
        assert_eq!(
            connector.calls(),
            vec![opened(), Call::Close, opened(), Call::Close]
        );
    }

    #[tokio::test]
    async fn rejected_credentials_fail_init() {
        let dir = tempfile::tempdir().unwrap();
        let connector = FakeConnector::failing_open();

        let err = run(&config(dir.path()), &connector).await.unwrap_err();
        assert!(err.to_string().starts_with("request access token"), "{err}");
    }
}
