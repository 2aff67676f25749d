use std::sync::Arc;

use queue::JobQueue;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub queue: Arc<dyn JobQueue>,
    pub config: AppConfig,
}
