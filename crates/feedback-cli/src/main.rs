use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};
use feedback_db::{DocumentStore, FeedbackServer, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "FeedbackDB command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write the default configuration to disk
    Init {
        #[arg(short, long, default_value = "feedback.yaml")]
        path: PathBuf,
    },
    /// Validate configuration without starting the server
    Check {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the current feedback document
    Show {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config } => {
            let settings = Settings::load(config)?;
            info!(?settings, "FeedbackDB starting");
            let server = FeedbackServer::new(settings)?;
            server.run().await?;
            info!("shutdown complete");
        }
        Command::Init { path } => {
            if path.exists() {
                println!("Configuration already exists at {}", path.display());
            } else {
                if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                    fs::create_dir_all(dir)?;
                }
                let serialized = serde_yaml::to_string(&Settings::default())?;
                fs::write(&path, serialized)?;
                println!("Initialized configuration at {}", path.display());
            }
        }
        Command::Check { config } => {
            let settings = Settings::load(config)?;
            println!(
                "Configuration OK: listening on {}, document at {}",
                settings.server.socket_addr(),
                settings.store.path.display()
            );
        }
        Command::Show { config } => {
            let settings = Settings::load(config)?;
            // Read-only: a missing document is shown as the default without
            // creating the file.
            let document = DocumentStore::from_config(&settings.store)
                .load_existing()?
                .unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }
    Ok(())
}
