mod client;
mod config;
mod engine;
mod http;
mod models;
mod protocol;
mod radarr;
mod server;
mod text;
mod tmdb;
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Settings;
use engine::Engine;
use http::HttpClient;
use radarr::RadarrClient;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tmdb::TmdbClient;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run the recommendation hub
    Serve {
        /// Path to the settings file
        #[arg(short, long, default_value = "config/settings_config.yaml")]
        config: PathBuf,

        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:5000")]
        bind: SocketAddr,
    },
    /// Run the terminal client against a hub
    Client {
        /// Hub address
        #[arg(short, long, default_value = "http://127.0.0.1:5000")]
        url: String,

        /// Where to keep client preferences
        #[arg(short, long, default_value = "radarec-prefs.json")]
        prefs: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they do not interleave with the client's page.
    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Mode::Serve { config, bind } => serve(config, bind).await,
        Mode::Client { url, prefs } => client::run(&url, &prefs).await,
    }
}

async fn serve(config_path: PathBuf, bind: SocketAddr) -> Result<()> {
    info!("Starting radarec v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(&config_path)?;
    info!("Settings loaded from: {}", config_path.display());
    let auto_start = settings.auto_start.then(|| settings.auto_start_delay());
    let settings = Arc::new(RwLock::new(settings));

    let http_client = HttpClient::new()?;
    let engine = Arc::new(Engine::new(
        Arc::clone(&settings),
        config_path,
        Arc::new(RadarrClient::new(http_client.clone(), Arc::clone(&settings))),
        Arc::new(TmdbClient::new(http_client, settings)),
    ));

    if let Some(delay) = auto_start {
        info!("Auto start in {:?}", delay);
        tokio::spawn(Arc::clone(&engine).auto_start(delay));
    }

    server::serve(engine, bind).await
}
