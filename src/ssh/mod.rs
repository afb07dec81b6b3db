//! SSH access to provisioned instances: key bootstrap and the client factory.

pub mod client;
pub mod keys;

pub use client::{HostKeyPolicy, SSH_USER, Session};
