//! SSH key bootstrap for the provider's `devpod` login.
//!
//! A key directory holds exactly two files: `id_devpod_rsa` (PKCS#1 PEM,
//! mode 0600) and `id_devpod_rsa.pub` (authorized-keys line, mode 0644).
//! The private file's presence is the only idempotency check; its content
//! is never validated or regenerated once it exists.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use rand_core::OsRng;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use ssh_key::public::KeyData;

use crate::error::ProviderError;
use crate::paths;

pub const KEY_BITS: usize = 2048;

/// Outcome of [`ensure_key_pair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    Generated,
    Existing,
}

/// Freshly generated key material.
pub struct KeyPair {
    pub private_pem: String,
    pub public_openssh: String,
}

/// Make sure `dir` exists and contains a key pair, generating one if the
/// private key file is missing.
///
/// Generation runs under an exclusive lock on a file in `dir`, so callers
/// racing on the same directory produce at most one key pair.
pub fn ensure_key_pair(dir: &Path) -> Result<Bootstrap, ProviderError> {
    create_key_dir(dir)?;

    let private_path = paths::private_key_path(dir);
    if private_path.exists() {
        return Ok(Bootstrap::Existing);
    }

    let _lock = lock_key_dir(dir)?;
    // Re-check under the lock: another process may have won the race.
    if private_path.exists() {
        return Ok(Bootstrap::Existing);
    }

    tracing::info!(dir = %dir.display(), "generating SSH key pair");
    let pair = generate_key_pair()?;

    // Public half first, so a present private key implies a written public key.
    write_key_file(&paths::public_key_path(dir), &pair.public_openssh, 0o644)
        .map_err(|e| ProviderError::keys("write public ssh key", e))?;
    // Written aside and renamed so the unlocked existence check above never
    // sees a half-written private key.
    let staging = dir.join(format!("{}.partial", paths::PRIVATE_KEY_FILE));
    write_key_file(&staging, &pair.private_pem, 0o600)
        .and_then(|()| fs::rename(&staging, &private_path))
        .map_err(|e| ProviderError::keys("write private ssh key", e))?;

    Ok(Bootstrap::Generated)
}

/// Return the PEM private key from `dir`, bootstrapping it first if needed.
pub fn private_key(dir: &Path) -> Result<String, ProviderError> {
    ensure_key_pair(dir)?;
    fs::read_to_string(paths::private_key_path(dir))
        .map_err(|e| ProviderError::keys("read private ssh key", e))
}

/// Return the authorized-keys public line from `dir`, bootstrapping it first if needed.
pub fn public_key(dir: &Path) -> Result<String, ProviderError> {
    ensure_key_pair(dir)?;
    fs::read_to_string(paths::public_key_path(dir))
        .map_err(|e| ProviderError::keys("read public ssh key", e))
}

/// Generate a 2048-bit RSA key pair encoded for on-disk use.
pub fn generate_key_pair() -> Result<KeyPair, ProviderError> {
    let private = RsaPrivateKey::new(&mut OsRng, KEY_BITS).map_err(|e| ProviderError::KeyGen {
        message: format!("generate private key: {e}"),
    })?;
    let private_pem = private
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| ProviderError::KeyGen {
            message: format!("encode private key: {e}"),
        })?
        .to_string();
    let public_openssh = authorized_key(&private.to_public_key())?;

    Ok(KeyPair {
        private_pem,
        public_openssh,
    })
}

/// Encode an RSA public key as an `authorized_keys` line, newline-terminated.
pub fn authorized_key(public: &RsaPublicKey) -> Result<String, ProviderError> {
    let key_data = ssh_key::public::RsaPublicKey::try_from(public).map_err(|e| {
        ProviderError::KeyGen {
            message: format!("convert public key: {e}"),
        }
    })?;
    let line = ssh_key::PublicKey::new(KeyData::Rsa(key_data), "")
        .to_openssh()
        .map_err(|e| ProviderError::KeyGen {
            message: format!("encode public key: {e}"),
        })?;
    Ok(format!("{line}\n"))
}

fn create_key_dir(dir: &Path) -> Result<(), ProviderError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(dir)
        .map_err(|e| ProviderError::keys(format!("create key directory {}", dir.display()), e))
}

fn lock_key_dir(dir: &Path) -> Result<File, ProviderError> {
    let path = paths::key_lock_path(dir);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| ProviderError::keys(format!("open key lock {}", path.display()), e))?;
    file.lock_exclusive()
        .map_err(|e| ProviderError::keys(format!("lock {}", path.display()), e))?;
    Ok(file)
}

fn write_key_file(path: &Path, content: &str, mode: u32) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())?;
    set_permissions(path, mode)
}

// The process umask can strip bits requested at open time.
#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
