//! Shared state for the API layer.

use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::predictor::PredictorClient;

/// Shared context for all routes and middleware.
///
/// The server owns its database file exclusively, so one connection
/// behind an async mutex is sufficient; handlers must not hold the
/// lock across the predictor call.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Arc<Mutex<Connection>>,
    pub predictor: Arc<PredictorClient>,
    pub config: Arc<AppConfig>,
}

impl ApiContext {
    pub fn new(db: Connection, predictor: PredictorClient, config: AppConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            predictor: Arc::new(predictor),
            config: Arc::new(config),
        }
    }
}

/// Authenticated user, injected into request extensions by the auth
/// middleware after token validation.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
}
