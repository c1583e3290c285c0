use std::path::{Path, PathBuf};

use clap::Parser;

use crate::catalog::{CatalogSource, DEFAULT_GEO_URL};
use crate::search::{DEFAULT_LIMIT, JAMENDO_BASE_URL};

/// Local copy of the geography document, preferred over the network
const LOCAL_GEO_FILE: &str = "data/world.geojson";

/// Command-line and environment configuration
#[derive(Clone, Debug, Parser)]
#[command(name = "world-music-map", version, about)]
pub struct Config {
    /// Jamendo API client id; without it only curated songs resolve
    #[arg(long, env = "JAMENDO_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Jamendo API base URL
    #[arg(long, env = "JAMENDO_BASE_URL", default_value = JAMENDO_BASE_URL)]
    pub jamendo_url: String,

    /// Results requested per search
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub search_limit: u32,

    /// GeoJSON world file (defaults to data/world.geojson if present)
    #[arg(long)]
    pub geo_file: Option<PathBuf>,

    /// URL of the GeoJSON world document when no file is used
    #[arg(long, default_value = DEFAULT_GEO_URL)]
    pub geo_url: String,

    /// TOML song table whose entries replace the built-in ones
    #[arg(long, env = "WORLD_MUSIC_SONGS")]
    pub songs: Option<PathBuf>,

    /// Player command, e.g. "mpv --no-video" (URL is appended)
    #[arg(long, env = "WORLD_MUSIC_PLAYER")]
    pub player: Option<String>,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, env = "WORLD_MUSIC_LOG", default_value = "world-music-map.log")]
    pub log_file: PathBuf,
}

impl Config {
    /// File if given or present locally, otherwise the URL
    pub fn catalog_source(&self) -> CatalogSource {
        match &self.geo_file {
            Some(path) => CatalogSource::File(path.clone()),
            None if Path::new(LOCAL_GEO_FILE).exists() => {
                CatalogSource::File(PathBuf::from(LOCAL_GEO_FILE))
            }
            None => CatalogSource::Url(self.geo_url.clone()),
        }
    }
}
