use clap::{Parser, ValueEnum};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const PRODUCTION_LOGIN_URL: &str = "https://seller.ahmakbar.site";
const DEVELOPMENT_LOGIN_URL: &str = "http://localhost:3001";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Production,
    Development,
}

/// Command line arguments, each backed by an environment variable.
#[derive(Debug, Parser)]
#[command(name = "umkm-directory", version, about = "Browse the UMKM business directory")]
pub struct Cli {
    /// Base URL of the directory API.
    #[arg(long, env = "UMKM_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Deployment environment, selects the seller login link.
    #[arg(long = "env", env = "UMKM_ENV", value_enum, default_value = "development")]
    pub environment: Environment,

    /// File holding saved favorites.
    #[arg(long, env = "UMKM_FAVORITES_PATH", default_value = ".umkm/favorites.json")]
    pub favorites: PathBuf,

    /// Log output file. The terminal belongs to the UI.
    #[arg(long, env = "UMKM_LOG_FILE", default_value = ".umkm/umkm-directory.log")]
    pub log_file: PathBuf,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "UMKM_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Key appended to coordinate-based map embeds.
    #[arg(long, env = "UMKM_MAPS_API_KEY")]
    pub maps_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub environment: Environment,
    pub favorites_path: PathBuf,
    pub request_timeout: Duration,
    pub maps_api_key: Option<String>,
}

impl Config {
    pub fn load(cli: Cli) -> Self {
        let api_base_url = validate_base_url(&cli.api_base_url);
        info!(%api_base_url, environment = ?cli.environment, "configuration loaded");

        let timeout_secs = if cli.timeout_secs == 0 {
            warn!("HTTP timeout of 0s is not allowed, using 10s");
            10
        } else {
            cli.timeout_secs
        };

        Self {
            api_base_url,
            environment: cli.environment,
            favorites_path: cli.favorites,
            request_timeout: Duration::from_secs(timeout_secs),
            maps_api_key: cli.maps_api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn login_url(&self) -> &'static str {
        match self.environment {
            Environment::Production => PRODUCTION_LOGIN_URL,
            Environment::Development => DEVELOPMENT_LOGIN_URL,
        }
    }
}

/// Returns the base URL without a trailing slash, or the default when it does not parse.
fn validate_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => trimmed.to_string(),
        Ok(url) => {
            warn!(raw, scheme = url.scheme(), "unsupported API scheme, using default");
            DEFAULT_API_BASE_URL.to_string()
        }
        Err(e) => {
            warn!(raw, error = %e, "invalid API base URL, using default");
            DEFAULT_API_BASE_URL.to_string()
        }
    }
}
