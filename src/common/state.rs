// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::services::{GoogleService, Mailer};

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt_secret: String,
    pub mailer: Arc<Mailer>,
    pub google_service: Arc<GoogleService>,
}
