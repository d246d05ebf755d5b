//! Tests for auth module
//!
//! Service-level tests run against an in-memory SQLite pool with the real
//! schema, so the conditional-update consume and the unique-index
//! find-or-create paths are exercised as deployed.

#[cfg(test)]
mod tests {
    use super::super::models::OtpPurpose;
    use super::super::services::{AuthService, OtpService};
    use crate::common::test_support::test_pool;
    use crate::common::ApiError;
    use crate::services::google::GoogleIdentity;
    use crate::services::Mailer;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use std::sync::Arc;

    fn otp_service(pool: &sqlx::SqlitePool) -> OtpService {
        OtpService::new(pool.clone(), Arc::new(Mailer::Disabled))
    }

    fn auth_service(pool: &sqlx::SqlitePool) -> AuthService {
        AuthService::new(pool.clone(), "test_secret_key".to_string())
    }

    async fn live_code_for(pool: &sqlx::SqlitePool, email: &str) -> String {
        let (code,): (String,) =
            sqlx::query_as("SELECT code FROM otps WHERE email = ? AND consumed = 0")
                .bind(email)
                .fetch_one(pool)
                .await
                .expect("expected exactly one live code");
        code
    }

    fn google_identity(subject: &str, email: &str) -> GoogleIdentity {
        GoogleIdentity {
            subject: subject.to_string(),
            email: email.to_string(),
            name: Some("Test User".to_string()),
            picture: Some("https://example.com/avatar.jpg".to_string()),
        }
    }

    // ------------------------------------------------------------------
    // OTP lifecycle
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_request_then_verify_succeeds_once() {
        let pool = test_pool().await;
        let otp = otp_service(&pool);

        otp.request_code("user@example.com", OtpPurpose::Signup)
            .await
            .unwrap();
        let code = live_code_for(&pool, "user@example.com").await;

        otp.verify_code("user@example.com", &code, OtpPurpose::Signup)
            .await
            .unwrap();

        // the code was consumed; replaying it fails
        let replay = otp
            .verify_code("user@example.com", &code, OtpPurpose::Signup)
            .await;
        assert!(matches!(replay, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_new_request_supersedes_prior_code() {
        let pool = test_pool().await;
        let otp = otp_service(&pool);

        otp.request_code("user@example.com", OtpPurpose::Signup)
            .await
            .unwrap();
        let first_code = live_code_for(&pool, "user@example.com").await;

        otp.request_code("user@example.com", OtpPurpose::Signup)
            .await
            .unwrap();
        let second_code = live_code_for(&pool, "user@example.com").await;

        // the first code is dead even though it never expired
        let stale = otp
            .verify_code("user@example.com", &first_code, OtpPurpose::Signup)
            .await;
        assert!(matches!(stale, Err(ApiError::BadRequest(_))));

        otp.verify_code("user@example.com", &second_code, OtpPurpose::Signup)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_purposes_do_not_cross() {
        let pool = test_pool().await;
        let otp = otp_service(&pool);

        otp.request_code("user@example.com", OtpPurpose::Signup)
            .await
            .unwrap();
        let code = live_code_for(&pool, "user@example.com").await;

        let wrong_purpose = otp
            .verify_code("user@example.com", &code, OtpPurpose::Login)
            .await;
        assert!(matches!(wrong_purpose, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_expired_code_fails() {
        let pool = test_pool().await;
        let otp = otp_service(&pool);

        let expired_at = (chrono::Utc::now() - chrono::Duration::minutes(1)).to_rfc3339();
        sqlx::query(
            "INSERT INTO otps (id, email, code, purpose, expires_at, consumed)
             VALUES ('P_TEST01', 'user@example.com', '123456', 'login', ?, 0)",
        )
        .bind(&expired_at)
        .execute(&pool)
        .await
        .unwrap();

        let result = otp
            .verify_code("user@example.com", "123456", OtpPurpose::Login)
            .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_wrong_code_fails() {
        let pool = test_pool().await;
        let otp = otp_service(&pool);

        otp.request_code("user@example.com", OtpPurpose::Login)
            .await
            .unwrap();

        // 1-in-a-million collision with the guess below; skip that run
        if live_code_for(&pool, "user@example.com").await == "000000" {
            return;
        }

        let result = otp
            .verify_code("user@example.com", "000000", OtpPurpose::Login)
            .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_concurrent_verification_single_winner() {
        let pool = test_pool().await;
        let otp_a = otp_service(&pool);
        let otp_b = otp_service(&pool);

        otp_a
            .request_code("user@example.com", OtpPurpose::Login)
            .await
            .unwrap();
        let code = live_code_for(&pool, "user@example.com").await;

        let (a, b) = tokio::join!(
            otp_a.verify_code("user@example.com", &code, OtpPurpose::Login),
            otp_b.verify_code("user@example.com", &code, OtpPurpose::Login),
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one concurrent verification may win");
    }

    #[tokio::test]
    async fn test_verify_normalizes_email_case() {
        let pool = test_pool().await;
        let otp = otp_service(&pool);

        otp.request_code("  User@Example.COM ", OtpPurpose::Signup)
            .await
            .unwrap();
        let code = live_code_for(&pool, "user@example.com").await;

        otp.verify_code("user@example.com", &code, OtpPurpose::Signup)
            .await
            .unwrap();
    }

    // ------------------------------------------------------------------
    // Account resolution
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_find_or_create_email_user_is_idempotent() {
        let pool = test_pool().await;
        let auth = auth_service(&pool);

        let first = auth
            .find_or_create_email_user("user@example.com")
            .await
            .unwrap();
        let second = auth
            .find_or_create_email_user("User@Example.com")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "user@example.com");
        assert_eq!(second.provider, "email");
    }

    #[tokio::test]
    async fn test_google_sign_in_creates_one_user_per_subject() {
        let pool = test_pool().await;
        let auth = auth_service(&pool);

        let identity = google_identity("109876543210", "g.user@example.com");

        let first = auth.find_or_create_google_user(&identity).await.unwrap();
        let second = auth.find_or_create_google_user(&identity).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.provider, "google");
        assert_eq!(second.provider_id.as_deref(), Some("109876543210"));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_google_sign_in_links_existing_email_account() {
        let pool = test_pool().await;
        let auth = auth_service(&pool);

        let email_user = auth
            .find_or_create_email_user("user@example.com")
            .await
            .unwrap();

        let identity = google_identity("109876543210", "User@Example.com");
        let linked = auth.find_or_create_google_user(&identity).await.unwrap();

        // same account, now carrying the Google identity
        assert_eq!(linked.id, email_user.id);
        assert_eq!(linked.provider, "google");
        assert_eq!(linked.provider_id.as_deref(), Some("109876543210"));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_google_profile_refresh_on_sign_in() {
        let pool = test_pool().await;
        let auth = auth_service(&pool);

        let mut identity = google_identity("109876543210", "g.user@example.com");
        auth.find_or_create_google_user(&identity).await.unwrap();

        identity.name = Some("Renamed User".to_string());
        let refreshed = auth.find_or_create_google_user(&identity).await.unwrap();

        assert_eq!(refreshed.name.as_deref(), Some("Renamed User"));
    }

    // ------------------------------------------------------------------
    // Session tokens
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_issued_token_round_trips() {
        let pool = test_pool().await;
        let auth = auth_service(&pool);

        let token = auth.issue_token("U_TEST01").unwrap();

        let decoded = decode::<super::super::models::Claims>(
            &token,
            &DecodingKey::from_secret("test_secret_key".as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .expect("Failed to decode token");

        assert_eq!(decoded.claims.sub, "U_TEST01");
        assert!(decoded.claims.exp > chrono::Utc::now().timestamp() as usize);
    }

    #[tokio::test]
    async fn test_token_validation_fails_with_wrong_secret() {
        let pool = test_pool().await;
        let auth = auth_service(&pool);

        let token = auth.issue_token("U_TEST01").unwrap();

        let result = decode::<super::super::models::Claims>(
            &token,
            &DecodingKey::from_secret("wrong_secret_key".as_bytes()),
            &Validation::new(Algorithm::HS256),
        );

        assert!(
            result.is_err(),
            "Token validation should fail with wrong secret"
        );
    }

    // ------------------------------------------------------------------
    // Payload validation
    // ------------------------------------------------------------------

    #[test]
    fn test_otp_request_payload_validation() {
        use super::super::models::OtpRequestPayload;
        use crate::common::Validator;

        let valid = OtpRequestPayload {
            email: "user@example.com".to_string(),
            purpose: "signup".to_string(),
        };
        assert!(valid.validate(&valid).is_valid);

        let bad_email = OtpRequestPayload {
            email: "not-an-email".to_string(),
            purpose: "signup".to_string(),
        };
        assert!(!bad_email.validate(&bad_email).is_valid);

        let bad_purpose = OtpRequestPayload {
            email: "user@example.com".to_string(),
            purpose: "password-reset".to_string(),
        };
        assert!(!bad_purpose.validate(&bad_purpose).is_valid);
    }

    #[test]
    fn test_otp_verify_payload_requires_six_digit_code() {
        use super::super::models::OtpVerifyPayload;
        use crate::common::Validator;

        let short = OtpVerifyPayload {
            email: "user@example.com".to_string(),
            code: "123".to_string(),
            purpose: "login".to_string(),
        };
        assert!(!short.validate(&short).is_valid);

        let alpha = OtpVerifyPayload {
            email: "user@example.com".to_string(),
            code: "12a456".to_string(),
            purpose: "login".to_string(),
        };
        assert!(!alpha.validate(&alpha).is_valid);

        let valid = OtpVerifyPayload {
            email: "user@example.com".to_string(),
            code: "123456".to_string(),
            purpose: "login".to_string(),
        };
        assert!(valid.validate(&valid).is_valid);
    }
}
