use std::sync::Arc;

use russh::client;
use russh::keys::{self, HashAlg, PrivateKeyWithHashAlg};
use russh::{ChannelMsg, Disconnect};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::ProviderError;

/// Login user provisioned on every instance through the `ssh-keys` metadata.
pub const SSH_USER: &str = "devpod";

/// How the client treats the key a server presents during the handshake.
///
/// `AcceptAny` performs no verification at all and is open to
/// man-in-the-middle attacks. It is the default unless `SSH_HOST_KEY` pins a
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyPolicy {
    AcceptAny,
    /// SHA-256 fingerprint as printed by `ssh-keygen -l`, e.g. `SHA256:abc...`.
    Fingerprint(String),
}

impl HostKeyPolicy {
    pub fn from_setting(pinned: Option<&str>) -> Self {
        match pinned {
            Some(fp) => HostKeyPolicy::Fingerprint(fp.trim().to_string()),
            None => HostKeyPolicy::AcceptAny,
        }
    }

    pub fn accepts(&self, fingerprint: &str) -> bool {
        match self {
            HostKeyPolicy::AcceptAny => true,
            HostKeyPolicy::Fingerprint(expected) => expected == fingerprint,
        }
    }
}

pub struct Handler {
    policy: HostKeyPolicy,
}

impl client::Handler for Handler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint(HashAlg::Sha256).to_string();
        let accepted = self.policy.accepts(&fingerprint);
        if !accepted {
            tracing::warn!(%fingerprint, "SSH host key does not match pinned fingerprint");
        }
        Ok(accepted)
    }
}

/// An authenticated SSH connection to an instance.
pub struct Session {
    handle: client::Handle<Handler>,
}

/// Parse `key_bytes` and open an authenticated session to `addr` as [`SSH_USER`].
pub async fn connect(
    addr: &str,
    key_bytes: &[u8],
    policy: HostKeyPolicy,
) -> Result<Session, ProviderError> {
    let key_text =
        std::str::from_utf8(key_bytes).map_err(|e| ProviderError::ssh("parse private key", e))?;
    let key = keys::decode_secret_key(key_text, None)
        .map_err(|e| ProviderError::ssh("parse private key", e))?;

    if policy == HostKeyPolicy::AcceptAny {
        tracing::warn!(addr, "SSH host key verification is disabled; accepting any server key");
    }

    let config = Arc::new(client::Config::default());
    tracing::info!(addr, user = SSH_USER, "connecting SSH");
    let mut handle = client::connect(config, addr, Handler { policy })
        .await
        .map_err(|e| ProviderError::ssh(format!("dial to {addr} failed"), e))?;

    // Plain `ssh-rsa` signatures are SHA-1 and refused by current sshd.
    let hash_alg = key.algorithm().is_rsa().then_some(HashAlg::Sha256);
    let key_with_alg = PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg);

    let auth = handle
        .authenticate_publickey(SSH_USER, key_with_alg)
        .await
        .map_err(|e| ProviderError::ssh("authenticate", e))?;
    if !auth.success() {
        return Err(ProviderError::ssh(
            "authenticate",
            format!("server rejected key for user {SSH_USER}"),
        ));
    }

    tracing::debug!(addr, "SSH authenticated");
    Ok(Session { handle })
}

impl Session {
    /// Run `command` remotely, streaming its output, and return its exit status.
    pub async fn exec<O, E>(
        &self,
        command: &str,
        stdout: &mut O,
        stderr: &mut E,
    ) -> Result<u32, ProviderError>
    where
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| ProviderError::ssh("open session channel", e))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| ProviderError::ssh("exec", e))?;

        let mut exit_status = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout
                    .write_all(data)
                    .await
                    .map_err(|e| ProviderError::ssh("write stdout", e))?,
                ChannelMsg::ExtendedData { ref data, ext: 1 } => stderr
                    .write_all(data)
                    .await
                    .map_err(|e| ProviderError::ssh("write stderr", e))?,
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }
        stdout
            .flush()
            .await
            .map_err(|e| ProviderError::ssh("write stdout", e))?;
        stderr
            .flush()
            .await
            .map_err(|e| ProviderError::ssh("write stderr", e))?;

        exit_status.ok_or_else(|| {
            ProviderError::ssh("exec", "channel closed without an exit status")
        })
    }

    pub async fn close(self) -> Result<(), ProviderError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| ProviderError::ssh("disconnect", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_any_accepts_everything() {
        let policy = HostKeyPolicy::from_setting(None);
        assert_eq!(policy, HostKeyPolicy::AcceptAny);
        assert!(policy.accepts("SHA256:anything"));
        assert!(policy.accepts(""));
    }

    #[test]
    fn pinned_fingerprint_must_match() {
        let policy = HostKeyPolicy::from_setting(Some(" SHA256:abc "));
        assert!(policy.accepts("SHA256:abc"));
        assert!(!policy.accepts("SHA256:abd"));
    }

    #[tokio::test]
    async fn unparseable_key_fails_before_dialing() {
        let err = connect("127.0.0.1:1", b"garbage", HostKeyPolicy::AcceptAny)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("parse private key"), "{err}");
    }

    #[tokio::test]
    async fn dial_failure_names_the_address() {
        let key = ssh_key::PrivateKey::random(&mut rand_core::OsRng, ssh_key::Algorithm::Ed25519)
            .unwrap();
        let pem = key.to_openssh(ssh_key::LineEnding::LF).unwrap();

        // Nothing listens on port 1.
        let err = connect("127.0.0.1:1", pem.as_bytes(), HostKeyPolicy::AcceptAny)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("dial to 127.0.0.1:1 failed"), "{err}");
    }
}
