//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/otp/request` - Issue an email one-time passcode
/// - `POST /api/auth/otp/verify` - Verify a passcode, establish a session
/// - `POST /api/auth/google` - Google ID token sign-in
/// - `POST /api/auth/logout` - Logout (client-side token removal)
/// - `GET /api/me` - Get current user information
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/otp/request", post(handlers::request_otp))
        .route("/api/auth/otp/verify", post(handlers::verify_otp))
        .route("/api/auth/google", post(handlers::google_auth))
        .route("/api/auth/logout", post(handlers::logout_handler))
        .route("/api/me", get(handlers::me_handler))
}
