//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::extractors::AuthedUser;
use super::models::{
    GoogleIdTokenPayload, OtpPurpose, OtpRequestPayload, OtpVerifyPayload, User,
};
use super::services::{AuthService, OtpService};
use crate::common::{safe_email_log, ApiError, AppState, Validator};
use crate::services::google::GoogleVerifyError;

/// POST /api/auth/otp/request
/// Issues a one-time passcode and emails it to the given address.
///
/// # Request Body
/// ```json
/// {
///   "email": "user@example.com",
///   "purpose": "signup"
/// }
/// ```
///
/// # Response
/// ```json
/// { "message": "otp_sent" }
/// ```
///
/// The acknowledgment is the same whether or not the address has an
/// account, so this endpoint cannot be used to probe for registered
/// emails.
pub async fn request_otp(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<OtpRequestPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let validation = payload.validate(&payload);
    if !validation.is_valid {
        return Err(ApiError::from(validation));
    }
    // validated above
    let purpose = OtpPurpose::parse(&payload.purpose)
        .ok_or_else(|| ApiError::ValidationError("purpose: invalid".to_string()))?;

    let otp_service = OtpService::new(state.db.clone(), state.mailer.clone());
    otp_service.request_code(&payload.email, purpose).await?;

    Ok(Json(serde_json::json!({ "message": "otp_sent" })))
}

/// POST /api/auth/otp/verify
/// Verifies a one-time passcode, resolving or creating the user account,
/// and returns a session token.
///
/// # Request Body
/// ```json
/// {
///   "email": "user@example.com",
///   "code": "123456",
///   "purpose": "signup"
/// }
/// ```
///
/// # Response
/// ```json
/// {
///   "token": "<jwt token>",
///   "user": { "id": "U_XXXXXX", "email": "...", "name": null, "picture": null }
/// }
/// ```
pub async fn verify_otp(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<OtpVerifyPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let validation = payload.validate(&payload);
    if !validation.is_valid {
        return Err(ApiError::from(validation));
    }
    let purpose = OtpPurpose::parse(&payload.purpose)
        .ok_or_else(|| ApiError::ValidationError("purpose: invalid".to_string()))?;

    let otp_service = OtpService::new(state.db.clone(), state.mailer.clone());
    otp_service
        .verify_code(&payload.email, &payload.code, purpose)
        .await?;

    let auth_service = AuthService::new(state.db.clone(), state.jwt_secret.clone());
    let user = auth_service.find_or_create_email_user(&payload.email).await?;
    let token = auth_service.issue_token(&user.id)?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        provider = "email",
        "User authentication successful via OTP"
    );

    Ok(Json(auth_response(token, &user)))
}

/// POST /api/auth/google
/// Authenticates a user via a Google ID token.
///
/// # Request Body
/// ```json
/// {
///   "idToken": "<google id token>"
/// }
/// ```
///
/// # Response
/// ```json
/// {
///   "token": "<jwt token>",
///   "user": { ... }
/// }
/// ```
pub async fn google_auth(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<GoogleIdTokenPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("Received Google auth request");
    let state = state_lock.read().await.clone();

    if payload.id_token.trim().is_empty() {
        return Err(ApiError::ValidationError("idToken: required".to_string()));
    }

    let identity = state
        .google_service
        .verify_id_token(&payload.id_token)
        .await
        .map_err(|e| match e {
            GoogleVerifyError::InvalidToken(msg) => {
                warn!(reason = %msg, "Google token rejected");
                ApiError::Unauthorized(msg)
            }
            GoogleVerifyError::Unavailable(msg) => {
                warn!(reason = %msg, "Google tokeninfo endpoint unavailable");
                ApiError::ServiceUnavailable(
                    "google token validation service unavailable".to_string(),
                )
            }
        })?;

    let auth_service = AuthService::new(state.db.clone(), state.jwt_secret.clone());
    let user = auth_service.find_or_create_google_user(&identity).await?;
    let token = auth_service.issue_token(&user.id)?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        provider = "google",
        "User authentication successful via Google sign-in"
    );

    Ok(Json(auth_response(token, &user)))
}

/// GET /api/me
/// Returns the current authenticated user's record.
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(serde_json::json!({ "user": user })))
}

/// POST /api/auth/logout
/// Logout is client-side with stateless JWTs; this endpoint confirms the
/// request so clients have something to await.
pub async fn logout_handler(_authed: AuthedUser) -> Result<Json<serde_json::Value>, ApiError> {
    info!("User logout successful");
    Ok(Json(serde_json::json!({ "message": "Logout successful" })))
}

fn auth_response(token: String, user: &User) -> serde_json::Value {
    serde_json::json!({
        "token": token,
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "picture": user.picture,
        },
    })
}
