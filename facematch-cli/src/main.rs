//! # FaceMatch CLI
//!
//! ```text
//! facematch serve  --config facematch.toml --catalog catalog.json
//! facematch search --catalog catalog.json --event 1 --query selfie.json
//! facematch health --url http://localhost:3000
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use facematch_api::server::{serve, AppState, SearchRequest};
use facematch_api::{logging, FaceMatchClient, RemoteClient};
use facematch_core::config::LogLevel;
use facematch_core::{Config, EventId};

#[derive(Parser)]
#[command(name = "facematch")]
#[command(about = "FaceMatch - find every event photo a person appears in", version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "FACEMATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Catalog to preload before accepting requests
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Run one search against a catalog file, without a server
    Search {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        event: u64,
        /// JSON file holding the 128-float query embedding
        #[arg(long)]
        query: PathBuf,
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(long)]
        max_results: Option<usize>,
    },
    /// Check that a server is up
    Health {
        #[arg(long, env = "FACEMATCH_URL", default_value = "http://localhost:3000")]
        url: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::from_file(path).with_context(|| format!("loading {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve { host, port, catalog } => {
            if let Some(host) = host {
                config.api.host = host;
            }
            if let Some(port) = port {
                config.api.port = port;
            }
            if catalog.is_some() {
                config.api.catalog = catalog;
            }
            config.validate()?;
            logging::init(&config.monitoring.logging)?;
            info!(version = facematch_core::VERSION, "Starting FaceMatch server");

            let state = Arc::new(AppState::bootstrap(config)?);
            serve(state).await?;
        }
        Commands::Search {
            catalog,
            event,
            query,
            threshold,
            max_results,
        } => {
            // Results go to stdout; keep the log quiet unless asked.
            config.monitoring.logging.level = LogLevel::Warn;
            logging::init(&config.monitoring.logging)?;

            let text = std::fs::read_to_string(&query)
                .with_context(|| format!("reading query {}", query.display()))?;
            let request = SearchRequest {
                query_embedding: serde_json::from_str(&text).context("query is not JSON")?,
                threshold,
                max_results,
            };

            let client = FaceMatchClient::new(&config);
            client.load_catalog(&catalog)?;
            let response = client.search_request(EventId(event), &request)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Health { url } => {
            let remote = RemoteClient::connect(url).await?;
            let stats = remote.metrics().await?;
            println!("{} is healthy", remote.base_url());
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
