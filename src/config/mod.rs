use crate::error::Error;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API server address
    #[serde(default = "default_address")]
    pub address: String,
    /// API server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Connection pool max size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Automatic migration on startup
    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,
}

fn default_db_url() -> String {
    "sqlite://wildfire.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_auto_migrate() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
            auto_migrate: default_auto_migrate(),
        }
    }
}

/// Security configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Secret used to sign owner tokens
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Owner token lifetime in days
    #[serde(default = "default_signature_ttl_days")]
    pub signature_ttl_days: u64,
    /// Serve `/api/owner-signature/:uid` (operator tooling only)
    #[serde(default)]
    pub expose_signatures: bool,
}

fn default_secret_key() -> String {
    "dev-secret-change-me".to_string()
}

fn default_signature_ttl_days() -> u64 {
    365
}

/// Longest accepted owner token lifetime, about a century
pub const MAX_SIGNATURE_TTL_DAYS: u64 = 36_500;

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            signature_ttl_days: default_signature_ttl_days(),
            expose_signatures: false,
        }
    }
}

/// Public map configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapConfig {
    /// Default map centre latitude
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,
    /// Default map centre longitude
    #[serde(default = "default_center_lon")]
    pub center_lon: f64,
    /// Default zoom level
    #[serde(default = "default_center_zoom")]
    pub center_zoom: u8,
    /// Public base URL of this service
    #[serde(default)]
    pub base_url: String,
    /// Public URL of the map page
    #[serde(default)]
    pub map_url: String,
    /// Directory holding `index.html` and `pick.html`
    #[serde(default = "default_webmap_dir")]
    pub webmap_dir: PathBuf,
}

fn default_center_lat() -> f64 {
    42.179
}

fn default_center_lon() -> f64 {
    18.942
}

fn default_center_zoom() -> u8 {
    12
}

fn default_webmap_dir() -> PathBuf {
    PathBuf::from("webmap")
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lon: default_center_lon(),
            center_zoom: default_center_zoom(),
            base_url: String::new(),
            map_url: String::new(),
            webmap_dir: default_webmap_dir(),
        }
    }
}

impl MapConfig {
    /// URL to advertise for the public map, if any usable one is configured.
    pub fn public_map_url(&self) -> Option<&str> {
        if is_public_http(&self.map_url) {
            Some(&self.map_url)
        } else if is_public_http(&self.base_url) {
            Some(&self.base_url)
        } else {
            None
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory created at start-up for log files
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    /// Write log records to `<dir>/server.log` instead of stderr
    #[serde(default = "default_to_file")]
    pub to_file: bool,
}

fn default_to_file() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            to_file: default_to_file(),
        }
    }
}

/// True for `http`/`https` URLs whose host is not a loopback name.
pub fn is_public_http(raw: &str) -> bool {
    if raw.is_empty() {
        return false;
    }
    let Ok(parsed) = url::Url::parse(raw) else {
        return false;
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    match parsed.host_str() {
        Some(host) => {
            let host = host.to_lowercase();
            host != "localhost" && host != "127.0.0.1"
        }
        None => false,
    }
}

impl Config {
    /// Reject values the services cannot work with
    pub fn validate(&self) -> Result<(), Error> {
        let ttl = self.security.signature_ttl_days;
        if !(1..=MAX_SIGNATURE_TTL_DAYS).contains(&ttl) {
            return Err(Error::Config(format!(
                "security.signature_ttl_days must be between 1 and {}, got {}",
                MAX_SIGNATURE_TTL_DAYS, ttl
            )));
        }
        if self.security.secret_key.is_empty() {
            return Err(Error::Config("security.secret_key must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Load configuration from a file or use default
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .context(format!("Failed to read config file: {:?}", path))?;

            let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
                serde_json::from_str(&config_str).context("Failed to parse JSON config")?
            } else if path.extension().map_or(false, |ext| ext == "toml") {
                toml::from_str(&config_str).context("Failed to parse TOML config")?
            } else {
                return Err(anyhow::anyhow!("Unsupported config file format"));
            };

            config.validate()?;
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

/// Overlay values from the process environment onto a loaded configuration
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

fn apply_overrides<F>(config: &mut Config, var: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(port) = get("PORT") {
        config.api.port = port.parse().context("PORT must be a port number")?;
    }
    if let Some(level) = get("LOG_LEVEL") {
        config.api.log_level = level.to_lowercase();
    }
    if let Some(url) = get("DATABASE_URL") {
        config.database.url = url;
    } else if let Some(path) = get("DB_PATH") {
        config.database.url = format!("sqlite://{}", path);
    }
    if let Some(secret) = get("SECRET_KEY") {
        config.security.secret_key = secret;
    }
    if let Some(lat) = get("CENTER_LAT") {
        config.map.center_lat = lat.parse().context("CENTER_LAT must be a number")?;
    }
    if let Some(lon) = get("CENTER_LON") {
        config.map.center_lon = lon.parse().context("CENTER_LON must be a number")?;
    }
    if let Some(zoom) = get("CENTER_ZOOM") {
        config.map.center_zoom = zoom.parse().context("CENTER_ZOOM must be an integer")?;
    }
    if let Some(base) = get("BASE_URL") {
        config.map.base_url = base;
    }
    if let Some(map) = get("MAP_URL") {
        config.map.map_url = map;
    }
    if let Some(dir) = get("LOG_DIR") {
        config.logging.dir = PathBuf::from(dir);
    }
    if let Some(days) = get("SIGNATURE_TTL_DAYS") {
        config.security.signature_ttl_days = days
            .parse()
            .context("SIGNATURE_TTL_DAYS must be a whole number of days")?;
    }

    config.validate()?;
    Ok(())
}
