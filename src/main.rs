mod api;
mod app;
mod config;
mod events;
mod favorites;
mod listing;
mod ui;
mod util;

use crate::api::client::{ApiClient, ApiError};
use crate::app::state::{App, Services};
use crate::config::{Cli, Config};
use crate::favorites::{FavoritesRegistry, store::FileStore};
use crate::listing::normalize::Normalizer;
use clap::Parser;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let cli = Cli::parse();
    init_logging(&cli.log_file);

    let config = Config::load(cli);
    let client = ApiClient::new(&config.api_base_url, config.request_timeout)?;
    let services = Services {
        normalizer: Normalizer::new(client.base_url()),
        client,
        maps_api_key: config.maps_api_key.clone(),
        login_url: config.login_url(),
    };

    // The registry lives exactly as long as the session.
    let store = FileStore::new(&config.favorites_path);
    info!(path = %store.path().display(), "opening favorites");
    let favorites = FavoritesRegistry::open(Box::new(store));
    let mut app = App::new(services, favorites);

    events::run::run_app(&mut app).await?;
    info!("session closed");
    Ok(())
}

/// Logs go to a file since the terminal is owned by the UI.
fn init_logging(path: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let _ = fs::create_dir_all(parent);
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        Err(e) => {
            fmt().with_env_filter(filter).with_writer(std::io::sink).init();
            warn!(error = %e, "log file unavailable, logging disabled");
        }
    }
}
