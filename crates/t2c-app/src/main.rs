//! time2code - a coding agent you talk to from the terminal
//!
//! `t2c chat` runs the interactive prompt loop, `t2c serve` starts the HTTP shell and
//! `t2c set-key` stores the API key in the project's encrypted credential store.

mod cli;
mod server;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use t2c_core::credentials::{API_KEY_NAME, PASSWORD_ENV};
use t2c_core::{Config, CredentialStore};

#[derive(Parser)]
#[command(name = "t2c", version, about = "Describe the code you want, the agent writes it")]
struct Args {
    /// Project directory holding `.time2code/` (defaults to the current directory)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive prompt loop (the default)
    Chat,
    /// Serve the HTTP shell
    Serve {
        /// Bind address, overriding `server.host`
        #[arg(long)]
        host: Option<String>,

        /// Port, overriding `server.port`
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// Read an API key from stdin and store it encrypted
    SetKey,
}

/// Initialize tracing for logging
fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "t2c=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn set_key(project_root: &std::path::Path) -> Result<()> {
    let password = std::env::var(PASSWORD_ENV)
        .with_context(|| format!("{} must be set to encrypt the key", PASSWORD_ENV))?;

    eprintln!("Paste the API key and press Enter:");
    let mut key = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut key)
        .context("Failed to read the API key")?;
    let key = key.trim();
    if key.is_empty() {
        bail!("No API key given");
    }

    let store = CredentialStore::for_project(project_root);
    store.set(API_KEY_NAME, key, &password)?;
    eprintln!("API key stored in {}", store.path().display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let project_root = match args.project_root {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let mut config = Config::load(&project_root)
        .with_context(|| format!("Failed to load configuration from {}", project_root.display()))?;

    match args.command.unwrap_or(Command::Chat) {
        Command::Chat => cli::run(config).await,
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::serve(&config.server).await
        }
        Command::SetKey => set_key(&project_root),
    }
}
