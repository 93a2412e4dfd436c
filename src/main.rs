pub mod app;
pub mod config;
pub mod controls;
pub mod data;
pub mod dropdown;
pub mod hover;
pub mod legend;
pub mod map;
pub mod page;
pub mod pick;
pub mod server;
pub mod style;
pub mod types;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::Session;
use crate::config::AppConfig;
use crate::data::DataSource;
use crate::map::{Camera, MapDocument};
use crate::page::PageDocument;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the neighbourhood map and its event API
    Serve {
        /// TOML config; built-in Toronto defaults when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Write the map style and page state to a directory
    Export {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[arg(short, long, value_name = "DIR", default_value = "out")]
        out: PathBuf,
    },
}

async fn start_session(config: &AppConfig) -> anyhow::Result<Session<MapDocument, PageDocument>> {
    let client = reqwest::Client::new();
    let source = DataSource::parse(&config.input.source);
    let map = MapDocument::new(Camera { center: config.view.center, zoom: config.view.zoom });
    // the in-memory map has no asynchronous style load to wait for
    Session::start(
        config.clone(),
        map,
        PageDocument::new(),
        data::load_neighbourhoods(&client, &source),
        std::future::ready(()),
    )
    .await
}

fn export(session: &Session<MapDocument, PageDocument>, out: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out).with_context(|| format!("Failed to create output directory: {:?}", out))?;
    let style_path = out.join("style.json");
    std::fs::write(&style_path, serde_json::to_string_pretty(&session.map.style())?)
        .with_context(|| format!("Failed to write {:?}", style_path))?;
    let page_path = out.join("page.json");
    std::fs::write(&page_path, serde_json::to_string_pretty(&session.page)?)
        .with_context(|| format!("Failed to write {:?}", page_path))?;
    info!(?out, "Export complete");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            let app_config = AppConfig::load(config.as_deref())?;
            info!(source = %app_config.input.source, "Serving neighbourhood map");
            let session = start_session(&app_config).await?;
            server::start_server(app_config, session).await?;
        }
        Commands::Export { config, out } => {
            let app_config = AppConfig::load(config.as_deref())?;
            let session = start_session(&app_config).await?;
            export(&session, out)?;
        }
    }

    Ok(())
}
