pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod predictor;
pub mod screening;

use crate::api::types::ApiContext;
use crate::config::{AppConfig, ConfigError};
use crate::db::DatabaseError;
use crate::predictor::PredictorClient;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Database: {0}")]
    Database(#[from] DatabaseError),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Load configuration, open the database, and serve until shutdown.
pub async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    tracing::info!(
        db = %config.database_path.display(),
        predictor_timeout_secs = config.predictor.timeout_secs(),
        "configuration loaded"
    );

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = db::sqlite::open_database(&config.database_path)?;

    let predictor = PredictorClient::from_config(&config.predictor);
    let bind_addr = config.bind_addr;
    let ctx = ApiContext::new(conn, predictor, config);

    api::server::run(ctx, bind_addr).await?;
    Ok(())
}
