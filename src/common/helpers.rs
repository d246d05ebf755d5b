// Helper functions for safe logging and shared database plumbing

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Canonical form of an email address: trimmed and lowercased.
///
/// Applied at every service boundary before the address touches the store,
/// so the unique index on users.email treats `Foo@Bar.com` and
/// `foo@bar.com` as the same account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            format!("{}***@{}", &parts[0][..1.min(parts[0].len())], parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
#[allow(dead_code)]
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// True for store errors worth a single retry: pool exhaustion, I/O hiccups,
/// and SQLite's busy/locked contention responses.
fn is_transient_db_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => {
            let msg = db.message();
            msg.contains("database is locked") || msg.contains("database is busy")
        }
        _ => false,
    }
}

const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Runs a store operation, retrying exactly once after a short backoff if
/// the first attempt fails transiently. Everything else propagates as-is.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    match op().await {
        Err(e) if is_transient_db_error(&e) => {
            warn!(error = %e, "Transient database error, retrying once");
            tokio::time::sleep(RETRY_BACKOFF).await;
            op().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Foo@Bar.COM "), "foo@bar.com");
        assert_eq!(normalize_email("user@example.com"), "user@example.com");
    }

    #[test]
    fn test_safe_email_log_masks_local_part() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("ab"), "***@***.***");
        assert_eq!(safe_email_log("not-an-email"), "***@***.***");
    }

    #[test]
    fn test_safe_token_log() {
        assert_eq!(safe_token_log("abcdefghij"), "abcd...ghij");
        assert_eq!(safe_token_log("short"), "***");
    }
}
