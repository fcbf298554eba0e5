//! Chatterbox main binary.

mod config;
mod conversation;
mod dispatch;
mod driver;
mod fallback;
mod gateway;
mod init;
mod random;
mod routes;
mod schedule;
mod server;
mod session;
mod sources;
mod telemetry;
mod termination;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "chatterbox",
    version,
    about = "A chat widget that answers with cat facts and trivia, then excuses itself"
)]
struct Cli {
    /// Config file (defaults to ~/.chatterbox/config.toml).
    #[arg(long, global = true, env = "CHATTERBOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the WebChat endpoint (default).
    Serve,
    /// Hold one conversation on this terminal.
    Chat,
    /// Initialize ~/.chatterbox with a config template (idempotent).
    Init,
    /// Validate config and content source settings.
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing()?;
    telemetry::install_panic_hook();

    let cli = Cli::parse();

    let command = if let Some(command) = cli.command {
        command
    } else {
        Command::Serve
    };

    match command {
        Command::Serve => server::serve(cli.config).await,
        Command::Chat => server::chat(cli.config).await,
        Command::Init => {
            let report = init::initialize_default().await?;
            if report.created.is_empty() {
                println!(
                    "chatterbox init: already initialized at {}",
                    report.root.display()
                );
            } else {
                println!("chatterbox init: initialized {}", report.root.display());
                for path in &report.created {
                    println!("created {}", path.display());
                }
            }
            println!("next: edit {}", report.root.join("config.toml").display());
            Ok(())
        }
        Command::Doctor => server::doctor(cli.config).await,
    }
}
