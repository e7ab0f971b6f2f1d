use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::SuiteConfig;
use crate::http::{self, AppState};
use crate::suite::Suite;

#[derive(Parser)]
#[clap(name = "gestion-suite", version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the JSON api.
    Serve(ServeOpts),
    /// Print the effective configuration as JSON.
    ShowConfig(ConfigOpts),
}

#[derive(Args)]
struct ConfigOpts {
    /// Path to a JSON configuration file.
    ///
    /// Missing keys fall back to the Madagascar defaults.
    #[clap(long = "config", env = "GESTION_CONFIG")]
    config: Option<PathBuf>,
}

impl ConfigOpts {
    fn load(&self) -> anyhow::Result<SuiteConfig> {
        match &self.config {
            Some(path) => SuiteConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display())),
            None => Ok(SuiteConfig::madagascar()),
        }
    }
}

#[derive(Args)]
struct ServeOpts {
    /// Address the server listens on.
    #[clap(long = "bind", default_value = "0.0.0.0:8080", env = "GESTION_BIND")]
    bind: SocketAddr,

    /// Snapshot of the books to start from, as written by the suite.
    #[clap(long = "books", env = "GESTION_BOOKS")]
    books: Option<PathBuf>,

    #[clap(flatten)]
    config: ConfigOpts,
}

async fn serve(opts: ServeOpts) -> anyhow::Result<()> {
    let config = opts.config.load()?;
    debug!(?config, "configuration loaded");

    let suite = match &opts.books {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Suite::from_json(config, &raw)?
        }
        None => Suite::new(config),
    };

    let app = http::router(AppState::new(suite));
    let listener = tokio::net::TcpListener::bind(opts.bind)
        .await
        .with_context(|| format!("binding {}", opts.bind))?;
    info!(address = %opts.bind, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

pub async fn run_with_sys_args() -> anyhow::Result<()> {
    use tracing_subscriber::prelude::*;

    let cli = Cli::parse();

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(fmt_layer).init();

    match cli.command {
        Commands::Serve(opts) => serve(opts).await,
        Commands::ShowConfig(opts) => {
            let config = opts.load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
