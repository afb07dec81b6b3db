use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use gce_provider::backend::gce::GceConnector;
use gce_provider::cli::{Cli, Command};
use gce_provider::commands;
use gce_provider::config::Config;
use gce_provider::logging;
use gce_provider::paths;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // stdout is read by the host (`status`, `command` output); logs go to stderr.
    let terminal_filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gce_provider=info"))
    };
    let terminal_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(terminal_filter);

    // File layer: discards until the machine folder is known.
    let (file_writer, file_handle) = logging::DeferredFileWriter::new();
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("gce_provider=debug"));

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .init();

    let config = Config::from_env()?;
    if let Err(e) = file_handle.set_file(&paths::log_path(&config.machine_folder)) {
        tracing::debug!(error = %e, "provider log unavailable");
    }
    tracing::debug!(?config, command = ?cli.command, "loaded configuration");

    let connector = GceConnector::new(config.credentials.clone());

    match cli.command {
        Command::Init => {
            commands::init::run(&config, &connector).await?;
        }
        Command::Create => commands::create::run(&config, &connector).await?,
        Command::Delete => commands::delete::run(&config, &connector).await?,
        Command::Start => commands::start::run(&config, &connector).await?,
        Command::Stop => commands::stop::run(&config, &connector).await?,
        Command::Status => {
            let status = commands::status::run(&config, &connector).await?;
            println!("{status}");
        }
        Command::Command { command } => {
            let mut stdout = tokio::io::stdout();
            let mut stderr = tokio::io::stderr();
            let code =
                commands::command::run(&config, &connector, &command, &mut stdout, &mut stderr)
                    .await?;
            if code != 0 {
                std::process::exit(i32::try_from(code).unwrap_or(1));
            }
        }
    }

    Ok(())
}
