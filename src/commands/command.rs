use tokio::io::AsyncWrite;

use crate::backend::{Compute, Connector};
use crate::config::Config;
use crate::error::ProviderError;
use crate::ssh::{self, HostKeyPolicy, keys};

const SSH_PORT: u16 = 22;

/// Run `command` on the instance over SSH, streaming its output into
/// `stdout` and `stderr`. Returns the remote exit status.
pub async fn run<C, O, E>(
    config: &Config,
    connector: &C,
    command: &str,
    stdout: &mut O,
    stderr: &mut E,
) -> Result<u32, ProviderError>
where
    C: Connector,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    if command.trim().is_empty() {
        return Err(ProviderError::Config {
            message: "COMMAND must be set".into(),
        });
    }

    let private_key = keys::private_key(&config.machine_folder)?;

    let client = connector.open(&config.project, &config.zone).await?;
    let ip = client.external_ip(&config.machine_id).await;
    client.close();
    let addr = format!("{}:{SSH_PORT}", ip?);

    let policy = HostKeyPolicy::from_setting(config.ssh_host_key.as_deref());
    let session = ssh::client::connect(&addr, private_key.as_bytes(), policy).await?;
    let result = session.exec(command, stdout, stderr).await;
    if let Err(e) = session.close().await {
        tracing::debug!(error = %e, "SSH disconnect failed");
    }

    let code = result?;
    tracing::debug!(%addr, code, "remote command finished");
    Ok(code)
}
