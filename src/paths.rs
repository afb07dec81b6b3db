use std::path::{Path, PathBuf};

/// Private key file name inside a key directory.
pub const PRIVATE_KEY_FILE: &str = "id_devpod_rsa";
/// Public key file name inside a key directory.
pub const PUBLIC_KEY_FILE: &str = "id_devpod_rsa.pub";
/// Lock file serialising key generation in a key directory.
pub const KEY_LOCK_FILE: &str = ".id_devpod_rsa.lock";

/// Per-machine state directory: `~/.local/share/gce-provider/<machine-id>/`
pub fn machine_dir(machine_id: &str) -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("gce-provider")
        .join(machine_id)
}

/// Application-default credentials written by `gcloud auth application-default login`.
pub fn default_credentials() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("gcloud")
        .join("application_default_credentials.json")
}

pub fn private_key_path(dir: &Path) -> PathBuf {
    dir.join(PRIVATE_KEY_FILE)
}

pub fn public_key_path(dir: &Path) -> PathBuf {
    dir.join(PUBLIC_KEY_FILE)
}

pub fn key_lock_path(dir: &Path) -> PathBuf {
    dir.join(KEY_LOCK_FILE)
}

/// Provider log inside the machine folder.
pub fn log_path(dir: &Path) -> PathBuf {
    dir.join("provider.log")
}
