use anyhow::{Context, Result};
use log::{info, warn};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use wildfire_map::config::{self, Config};
use wildfire_map::security::SecurityService;
use wildfire_map::{DatabaseService, RestApi};

/// Set up env_logger. `RUST_LOG` wins over the configured level.
fn init_logging(config: &Config) -> Result<()> {
    let env = env_logger::Env::default().default_filter_or(config.api.log_level.as_str());
    let mut builder = env_logger::Builder::from_env(env);

    if config.logging.to_file {
        let path = config.logging.dir.join("server.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("Failed to initialise logger")?;
    Ok(())
}

async fn run_app() -> Result<()> {
    // .env is optional outside development
    dotenv::dotenv().ok();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CONFIG_PATH").ok())
        .map(PathBuf::from);
    let mut config = config::load_config(config_path.as_deref())?;
    config::apply_env_overrides(&mut config)?;

    std::fs::create_dir_all(&config.logging.dir)
        .with_context(|| format!("Failed to create log directory {:?}", config.logging.dir))?;

    init_logging(&config)?;
    info!("Starting wildfire map service v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded");

    if config.security.secret_key == "dev-secret-change-me" {
        warn!("Using the development secret key; set SECRET_KEY in production");
    }
    match config.map.public_map_url() {
        Some(url) => info!("Public map URL: {}", url),
        None => warn!("MAP_URL/BASE_URL are not public http(s) URLs"),
    }

    let database = DatabaseService::new(&config.database).await?;
    let security = Arc::new(SecurityService::new(config.security.clone()));

    let http_server = RestApi::new(&config.api, &config.map, database.pool.clone(), security)?;

    http_server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutting down...");
        })
        .await?;

    database.pool.close().await;
    info!("Server stopped");

    Ok(())
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Application error: failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_app()) {
        eprintln!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
