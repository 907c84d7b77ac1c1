use std::{path::PathBuf, time::Duration};

use crate::error::Result;
pub use clap::Parser;
use tvshows_app::state::AppConfig;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 5000,
        env = "TVSHOWS_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "TVSHOWS_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "TVSHOWS_BASE_URL",
        default_value = "http://localhost:5000",
        help = "Base URL of the service as visible to clients, used in _links"
    )]
    pub base_url: Url,

    #[arg(
        long,
        env = "TVSHOWS_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/tvshows.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "TVSHOWS_DATA_DIR",
        help = "Data directory for the database, default is system default like ~/.local/share/tvshows",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "TVSHOWS_TVMAZE_URL",
        default_value = "https://api.tvmaze.com/",
        help = "Base URL of the TVMaze compatible show search service"
    )]
    pub tvmaze_url: Url,

    #[arg(
        long,
        env = "TVSHOWS_TVMAZE_TIMEOUT",
        default_value = "10s",
        help = "Timeout of show search requests in human friendly format (e.g. 10s, 1m)",
        value_parser = humantime::parse_duration
    )]
    pub tvmaze_timeout: Duration,

    #[arg(
        long,
        env = "TVSHOWS_DEFAULT_PAGE_SIZE",
        default_value = "100",
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Default page size of show listing"
    )]
    pub default_page_size: u32,

    #[arg(long, env = "TVSHOWS_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("tvshows"))
        .unwrap_or_else(|| PathBuf::from("tvshows"))
        .to_string_lossy()
        .to_string()
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/tvshows.db", self.data_dir))
    }
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        AppConfig {
            base_url: config.base_url.clone(),
            default_page_size: config.default_page_size,
        }
    }
}
