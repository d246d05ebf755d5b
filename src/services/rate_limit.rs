// src/services/rate_limit.rs
//! Fixed-window request limiting, in process.
//!
//! Two budgets: a general per-IP budget, and a tighter one for
//! `/api/auth/*` so OTP codes cannot be brute-forced within their
//! ten-minute lifetime.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_ip_limit: u32,
    pub auth_route_limit: u32,
    pub window_seconds: u32,
    pub whitelist_ips: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_ip_limit: 60,     // 60 requests per minute per IP
            auth_route_limit: 10, // 10 auth attempts per minute per IP
            window_seconds: 60,
            whitelist_ips: vec!["127.0.0.1".to_string(), "::1".to_string()],
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // RATE_LIMIT_ENABLED - set to "false" to disable rate limiting
        if let Ok(enabled) = env::var("RATE_LIMIT_ENABLED") {
            config.enabled = enabled.to_lowercase() != "false";
        }

        if let Ok(limit) = env::var("RATE_LIMIT_PER_IP") {
            if let Ok(val) = limit.parse::<u32>() {
                config.per_ip_limit = val;
            }
        }

        if let Ok(limit) = env::var("RATE_LIMIT_AUTH_ROUTES") {
            if let Ok(val) = limit.parse::<u32>() {
                config.auth_route_limit = val;
            }
        }

        if let Ok(window) = env::var("RATE_LIMIT_WINDOW_SECONDS") {
            if let Ok(val) = window.parse::<u32>() {
                config.window_seconds = val;
            }
        }

        if let Ok(whitelist) = env::var("RATE_LIMIT_WHITELIST_IPS") {
            config.whitelist_ips = whitelist
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config
    }
}

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

impl WindowState {
    fn new() -> Self {
        Self {
            count: 1,
            window_start: Instant::now(),
        }
    }

    fn is_expired(&self, window: Duration) -> bool {
        self.window_start.elapsed() > window
    }
}

#[derive(Debug)]
pub enum RateLimitResult {
    Allowed,
    Limited { retry_after: u32 },
}

#[derive(Debug, Clone)]
pub struct RateLimitService {
    config: RateLimitConfig,
    windows: Arc<RwLock<HashMap<String, WindowState>>>,
}

// Expired entries are swept whenever the map crosses this size
const CLEANUP_THRESHOLD: usize = 4096;

impl RateLimitService {
    pub fn new() -> Self {
        let config = RateLimitConfig::from_env();
        info!(
            enabled = config.enabled,
            per_ip_limit = config.per_ip_limit,
            auth_route_limit = config.auth_route_limit,
            window_seconds = config.window_seconds,
            whitelist_ips = ?config.whitelist_ips,
            "Initializing RateLimitService"
        );
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn is_whitelisted(&self, ip: &str) -> bool {
        self.config.whitelist_ips.iter().any(|w| w == ip)
    }

    /// Check and count one request from `ip`. Auth routes draw from their
    /// own, smaller budget keyed separately from general traffic.
    pub async fn check(&self, ip: &str, is_auth_route: bool) -> RateLimitResult {
        if !self.config.enabled || self.is_whitelisted(ip) {
            return RateLimitResult::Allowed;
        }

        let (scope, limit) = if is_auth_route {
            ("auth", self.config.auth_route_limit)
        } else {
            ("ip", self.config.per_ip_limit)
        };
        let key = format!("{}:{}", scope, ip);
        let window = Duration::from_secs(self.config.window_seconds as u64);

        let mut windows = self.windows.write().await;

        if windows.len() > CLEANUP_THRESHOLD {
            windows.retain(|_, state| !state.is_expired(window));
        }

        match windows.get_mut(&key) {
            Some(state) if state.is_expired(window) => {
                *state = WindowState::new();
                RateLimitResult::Allowed
            }
            Some(state) if state.count >= limit => {
                let elapsed = state.window_start.elapsed().as_secs() as u32;
                let retry_after = self.config.window_seconds.saturating_sub(elapsed).max(1);
                RateLimitResult::Limited { retry_after }
            }
            Some(state) => {
                state.count += 1;
                RateLimitResult::Allowed
            }
            None => {
                windows.insert(key, WindowState::new());
                RateLimitResult::Allowed
            }
        }
    }
}

impl Default for RateLimitService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with(config: RateLimitConfig) -> RateLimitService {
        RateLimitService {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn strict_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            per_ip_limit: 3,
            auth_route_limit: 2,
            window_seconds: 60,
            whitelist_ips: vec!["10.0.0.1".to_string()],
        }
    }

    #[tokio::test]
    async fn test_limits_after_budget_exhausted() {
        let service = service_with(strict_config());

        for _ in 0..3 {
            assert!(matches!(
                service.check("203.0.113.1", false).await,
                RateLimitResult::Allowed
            ));
        }
        assert!(matches!(
            service.check("203.0.113.1", false).await,
            RateLimitResult::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn test_auth_routes_have_tighter_budget() {
        let service = service_with(strict_config());

        for _ in 0..2 {
            assert!(matches!(
                service.check("203.0.113.1", true).await,
                RateLimitResult::Allowed
            ));
        }
        assert!(matches!(
            service.check("203.0.113.1", true).await,
            RateLimitResult::Limited { .. }
        ));

        // the general budget for the same IP is untouched
        assert!(matches!(
            service.check("203.0.113.1", false).await,
            RateLimitResult::Allowed
        ));
    }

    #[tokio::test]
    async fn test_whitelisted_ip_is_never_limited() {
        let service = service_with(strict_config());

        for _ in 0..10 {
            assert!(matches!(
                service.check("10.0.0.1", true).await,
                RateLimitResult::Allowed
            ));
        }
    }

    #[tokio::test]
    async fn test_ips_are_counted_independently() {
        let service = service_with(strict_config());

        for _ in 0..3 {
            service.check("203.0.113.1", false).await;
        }
        assert!(matches!(
            service.check("198.51.100.7", false).await,
            RateLimitResult::Allowed
        ));
    }

    #[tokio::test]
    async fn test_disabled_limiter_allows_everything() {
        let mut config = strict_config();
        config.enabled = false;
        let service = service_with(config);

        for _ in 0..20 {
            assert!(matches!(
                service.check("203.0.113.1", true).await,
                RateLimitResult::Allowed
            ));
        }
    }
}
