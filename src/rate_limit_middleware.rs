// rate_limit_middleware.rs
use crate::services::rate_limit::{RateLimitResult, RateLimitService};
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Serialize)]
struct RateLimitErrorResponse {
    message: String,
    code: String,
    retry_after: u32,
}

/// Extract the client IP: proxy headers first, then the socket address.
fn extract_ip_address(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // First IP in the chain is the original client
            if let Some(first_ip) = forwarded_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    connect_info.map(|info| info.0.ip().to_string())
}

/// Rate limiting middleware
///
/// Auth endpoints draw from a tighter per-IP budget than the rest of the
/// API; see `RateLimitService`.
pub async fn rate_limit_middleware(
    Extension(rate_limit_service): Extension<Arc<RateLimitService>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip_address = extract_ip_address(request.headers(), connect_info.as_ref())
        .unwrap_or_else(|| "unknown".to_string());

    let path = request.uri().path().to_string();
    let is_auth_route = path.starts_with("/api/auth/");

    match rate_limit_service.check(&ip_address, is_auth_route).await {
        RateLimitResult::Allowed => {
            debug!(ip = %ip_address, path = %path, "Request allowed by rate limiter");
            Ok(next.run(request).await)
        }
        RateLimitResult::Limited { retry_after } => {
            warn!(
                ip = %ip_address,
                path = %path,
                retry_after = retry_after,
                "Request blocked by rate limiter"
            );

            let error_response = RateLimitErrorResponse {
                message: "Rate limit exceeded. Please try again later.".to_string(),
                code: "RATE_LIMIT_EXCEEDED".to_string(),
                retry_after,
            };

            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();

            if let Ok(retry_header) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("retry-after", retry_header);
            }

            Err(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        let ip = extract_ip_address(&headers, None);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        let ip = extract_ip_address(&headers, None);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_no_ip_sources_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_ip_address(&headers, None), None);
    }
}
