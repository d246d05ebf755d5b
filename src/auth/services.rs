//! Authentication services: one-time passcodes and account/session handling.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use super::models::{Claims, OtpPurpose, User};
use crate::common::{
    generate_otp_code, generate_otp_id, generate_user_id, normalize_email, safe_email_log,
    with_retry, ApiError,
};
use crate::services::email::{generate_otp_email, otp_email_subject};
use crate::services::google::GoogleIdentity;
use crate::services::Mailer;

pub const OTP_CODE_LENGTH: usize = 6;
pub const OTP_TTL_MINUTES: i64 = 10;
const TOKEN_TTL_HOURS: i64 = 24;

// ============================================================================
// OTP Service
// ============================================================================

pub struct OtpService {
    db: SqlitePool,
    mailer: Arc<Mailer>,
}

impl OtpService {
    pub fn new(db: SqlitePool, mailer: Arc<Mailer>) -> Self {
        Self { db, mailer }
    }

    /// Issue a fresh code for (email, purpose) and hand it to the mailer.
    ///
    /// Any prior unconsumed code for the same pair is superseded first, so
    /// at most one code is ever live per pair. The caller returns the same
    /// generic acknowledgment whether or not the address has an account.
    pub async fn request_code(&self, email: &str, purpose: OtpPurpose) -> Result<(), ApiError> {
        let email = normalize_email(email);
        let code = generate_otp_code(OTP_CODE_LENGTH);
        let otp_id = generate_otp_id();
        let expires_at = (Utc::now() + Duration::minutes(OTP_TTL_MINUTES)).to_rfc3339();

        // Supersede: older codes die the moment a new one is requested
        {
            let db = self.db.clone();
            let email = email.clone();
            with_retry(move || {
                let db = db.clone();
                let email = email.clone();
                async move {
                    sqlx::query(
                        "UPDATE otps SET consumed = 1 WHERE email = ? AND purpose = ? AND consumed = 0",
                    )
                    .bind(&email)
                    .bind(purpose.as_str())
                    .execute(&db)
                    .await
                }
            })
            .await
            .map_err(ApiError::DatabaseError)?;
        }

        sqlx::query(
            r#"
            INSERT INTO otps (id, email, code, purpose, expires_at, consumed)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&otp_id)
        .bind(&email)
        .bind(&code)
        .bind(purpose.as_str())
        .bind(&expires_at)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        info!(
            email = %safe_email_log(&email),
            purpose = purpose.as_str(),
            "One-time passcode issued"
        );

        let subject = otp_email_subject(&code);
        let body = generate_otp_email(&code, OTP_TTL_MINUTES);
        self.mailer.send(&email, &subject, &body).await.map_err(|e| {
            warn!(error = %e, email = %safe_email_log(&email), "OTP email delivery failed");
            ApiError::ServiceUnavailable("email delivery unavailable, try again".to_string())
        })?;

        Ok(())
    }

    /// Consume a code. The single conditional UPDATE is the atomic
    /// check-and-mark: of any number of concurrent verifications for the
    /// same code, exactly one sees a row flip and succeeds.
    pub async fn verify_code(
        &self,
        email: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), ApiError> {
        let email = normalize_email(email);
        let now = Utc::now().to_rfc3339();

        let result = {
            let db = self.db.clone();
            let email = email.clone();
            let code = code.to_string();
            let now = now.clone();
            with_retry(move || {
                let db = db.clone();
                let email = email.clone();
                let code = code.clone();
                let now = now.clone();
                async move {
                    sqlx::query(
                        r#"
                        UPDATE otps SET consumed = 1
                        WHERE email = ? AND purpose = ? AND code = ?
                          AND consumed = 0 AND expires_at > ?
                        "#,
                    )
                    .bind(&email)
                    .bind(purpose.as_str())
                    .bind(&code)
                    .bind(&now)
                    .execute(&db)
                    .await
                }
            })
            .await
            .map_err(ApiError::DatabaseError)?
        };

        if result.rows_affected() == 0 {
            warn!(
                email = %safe_email_log(&email),
                purpose = purpose.as_str(),
                "OTP verification failed: no live matching code"
            );
            return Err(ApiError::BadRequest("invalid or expired code".to_string()));
        }

        info!(
            email = %safe_email_log(&email),
            purpose = purpose.as_str(),
            "OTP verification successful"
        );

        Ok(())
    }
}

// ============================================================================
// Auth Service
// ============================================================================

pub struct AuthService {
    db: SqlitePool,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(db: SqlitePool, jwt_secret: String) -> Self {
        Self { db, jwt_secret }
    }

    /// Find-or-create a user keyed by the unique email column.
    ///
    /// INSERT OR IGNORE rides the unique index: under concurrent signups
    /// for the same address, one insert wins, the rest no-op, and the
    /// re-read returns the single surviving row either way.
    pub async fn find_or_create_email_user(&self, email: &str) -> Result<User, ApiError> {
        let email = normalize_email(email);
        let id = generate_user_id();

        {
            let db = self.db.clone();
            let id = id.clone();
            let email = email.clone();
            with_retry(move || {
                let db = db.clone();
                let id = id.clone();
                let email = email.clone();
                async move {
                    sqlx::query(
                        "INSERT OR IGNORE INTO users (id, email, provider) VALUES (?, ?, 'email')",
                    )
                    .bind(&id)
                    .bind(&email)
                    .execute(&db)
                    .await
                }
            })
            .await
            .map_err(ApiError::DatabaseError)?;
        }

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        if user.id == id {
            info!(
                user_id = %user.id,
                email = %safe_email_log(&email),
                provider = "email",
                "Created new user account"
            );
        }

        Ok(user)
    }

    /// Find-or-create a user for a verified Google identity.
    ///
    /// Lookup order: the (provider, provider_id) pair; then an existing
    /// email-provider account with the same address, which gets linked to
    /// the Google identity; then a fresh insert.
    pub async fn find_or_create_google_user(
        &self,
        identity: &GoogleIdentity,
    ) -> Result<User, ApiError> {
        let email = normalize_email(&identity.email);

        if let Some(user) = self.fetch_by_google_subject(&identity.subject).await? {
            return self.refresh_profile(user, identity).await;
        }

        if let Some(user) = self.fetch_by_email(&email).await? {
            // Account linking: the address was registered via OTP first.
            // The row becomes a Google account; the user id is stable.
            info!(
                user_id = %user.id,
                email = %safe_email_log(&email),
                "Linking existing email account to Google identity"
            );
            sqlx::query(
                r#"
                UPDATE users SET provider = 'google', provider_id = ?,
                       name = COALESCE(?, name), picture = COALESCE(?, picture)
                WHERE id = ?
                "#,
            )
            .bind(&identity.subject)
            .bind(identity.name.as_deref())
            .bind(identity.picture.as_deref())
            .bind(&user.id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

            return self
                .fetch_by_google_subject(&identity.subject)
                .await?
                .ok_or_else(|| ApiError::InternalServer("user lookup failed".to_string()));
        }

        let id = generate_user_id();
        {
            let db = self.db.clone();
            let id = id.clone();
            let email = email.clone();
            let identity = identity.clone();
            with_retry(move || {
                let db = db.clone();
                let id = id.clone();
                let email = email.clone();
                let identity = identity.clone();
                async move {
                    sqlx::query(
                        r#"
                        INSERT OR IGNORE INTO users (id, email, name, picture, provider, provider_id)
                        VALUES (?, ?, ?, ?, 'google', ?)
                        "#,
                    )
                    .bind(&id)
                    .bind(&email)
                    .bind(identity.name.as_deref())
                    .bind(identity.picture.as_deref())
                    .bind(&identity.subject)
                    .execute(&db)
                    .await
                }
            })
            .await
            .map_err(ApiError::DatabaseError)?;
        }

        if let Some(user) = self.fetch_by_google_subject(&identity.subject).await? {
            info!(
                user_id = %user.id,
                email = %safe_email_log(&email),
                provider = "google",
                "Created new user account via Google sign-in"
            );
            return Ok(user);
        }

        // The insert was ignored: a concurrent request took the email.
        // That row is the account; link it.
        match self.fetch_by_email(&email).await? {
            Some(user) => {
                sqlx::query("UPDATE users SET provider = 'google', provider_id = ? WHERE id = ?")
                    .bind(&identity.subject)
                    .bind(&user.id)
                    .execute(&self.db)
                    .await
                    .map_err(ApiError::DatabaseError)?;
                self.fetch_by_google_subject(&identity.subject)
                    .await?
                    .ok_or_else(|| ApiError::InternalServer("user lookup failed".to_string()))
            }
            None => Err(ApiError::InternalServer("user lookup failed".to_string())),
        }
    }

    /// Encode a session token: user id as subject, 24 h expiry, HS256.
    pub fn issue_token(&self, user_id: &str) -> Result<String, ApiError> {
        let exp = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            exp,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user_id, "JWT encoding error");
            ApiError::InternalServer("token issuance failed".to_string())
        })
    }

    async fn fetch_by_google_subject(&self, subject: &str) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE provider = 'google' AND provider_id = ?",
        )
        .bind(subject)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    async fn fetch_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// Keep name/picture current with what Google reports.
    async fn refresh_profile(
        &self,
        user: User,
        identity: &GoogleIdentity,
    ) -> Result<User, ApiError> {
        let name_changed = identity.name.is_some() && identity.name != user.name;
        let picture_changed = identity.picture.is_some() && identity.picture != user.picture;
        if !name_changed && !picture_changed {
            return Ok(user);
        }

        sqlx::query(
            "UPDATE users SET name = COALESCE(?, name), picture = COALESCE(?, picture) WHERE id = ?",
        )
        .bind(identity.name.as_deref())
        .bind(identity.picture.as_deref())
        .bind(&user.id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(&user.id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::DatabaseError)
    }
}
