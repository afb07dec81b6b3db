use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "gce-provider",
    version,
    about = "Google Compute Engine machine provider for development environments"
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Options come from the environment the host prepares (PROJECT, ZONE,
/// MACHINE_ID, ...), not from flags.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the SSH key pair and verify API credentials
    Init,

    /// Create the instance
    Create,

    /// Delete the instance
    Delete,

    /// Start a stopped instance
    Start,

    /// Stop the instance
    Stop,

    /// Print the instance status (Running, Stopped, Busy or NotFound)
    Status,

    /// Run a command on the instance over SSH
    Command {
        /// Shell command to execute remotely
        #[arg(env = "COMMAND", hide_env_values = true)]
        command: String,
    },
}
