//! # FaceMatch Server
//!
//! Run with: `cargo run --bin facematch-server -- --config facematch.toml --port 3000`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use facematch_api::logging;
use facematch_api::server::{serve, AppState};
use facematch_core::Config;

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a String> {
    args.iter().position(|a| a == name).and_then(|i| args.get(i + 1))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match flag(&args, "--config") {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(host) = flag(&args, "--host") {
        config.api.host = host.clone();
    }
    if let Some(port) = flag(&args, "--port") {
        config.api.port = port.parse()?;
    }
    if let Some(catalog) = flag(&args, "--catalog") {
        config.api.catalog = Some(PathBuf::from(catalog));
    }
    config.validate()?;

    logging::init(&config.monitoring.logging)?;
    info!(version = facematch_core::VERSION, "Starting FaceMatch server");

    let state = Arc::new(AppState::bootstrap(config)?);
    serve(state).await?;

    Ok(())
}
