//! One handler per CLI verb.
//!
//! Every handler opens a compute handle for the configured project and zone,
//! performs a single operation and closes the handle whether or not the
//! operation succeeded. Errors propagate unretried.

pub mod command;
pub mod create;
pub mod delete;
pub mod init;
pub mod start;
pub mod status;
pub mod stop;

#[cfg(test)]
pub(crate) mod test_support;
