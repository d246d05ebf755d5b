// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod common;
mod notes;
mod rate_limit_middleware;
mod services;

use common::AppState;
use rate_limit_middleware::rate_limit_middleware;
use services::{GoogleService, Mailer, RateLimitService};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://notes_api.db".to_string());
    let jwt_secret =
        env::var("JWT_SECRET").unwrap_or_else(|_| "replace_with_strong_secret".to_string());
    if jwt_secret == "replace_with_strong_secret" {
        warn!("JWT_SECRET not set, using an insecure default");
    }
    let google_client_id = env::var("GOOGLE_CLIENT_ID").ok();

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    // One client for all outbound calls; the timeout bounds how long a
    // request can hang on Google before surfacing 503 to the caller
    let http_client = Client::builder().timeout(Duration::from_secs(10)).build()?;

    let mailer = Arc::new(Mailer::from_env().await);

    let google_service = Arc::new(GoogleService::new(http_client, google_client_id));
    info!("GoogleService initialized");

    let rate_limit_service = Arc::new(RateLimitService::new());

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        db: pool,
        jwt_secret,
        mailer,
        google_service,
    };

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(auth::auth_routes())
        .merge(notes::notes_routes())
        .layer(middleware::from_fn(rate_limit_middleware))
        .layer(Extension(rate_limit_service))
        .layer(Extension(shared.clone()))
        .layer({
            let cors_origins = std::env::var("CORS_ORIGINS").unwrap_or_else(|_| {
                "http://localhost:3000,http://localhost:5173".to_string()
            });

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
