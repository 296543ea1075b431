//! Rate limiting middleware using Redis cache.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::api::AppState;
use crate::config::{
    RATE_LIMIT_AUTH_REQUESTS, RATE_LIMIT_AUTH_WINDOW_SECONDS, RATE_LIMIT_REQUESTS,
    RATE_LIMIT_WINDOW_SECONDS,
};

/// Rate limit error response
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from(self.retry_after));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));

        (
            StatusCode::TOO_MANY_REQUESTS,
            headers,
            "Too many requests. Please try again later.",
        )
            .into_response()
    }
}

/// One fixed-window budget
struct Policy {
    scope: &'static str,
    limit: u64,
    window: u64,
}

const GENERAL: Policy = Policy {
    scope: "general",
    limit: RATE_LIMIT_REQUESTS,
    window: RATE_LIMIT_WINDOW_SECONDS,
};

const AUTH: Policy = Policy {
    scope: "auth",
    limit: RATE_LIMIT_AUTH_REQUESTS,
    window: RATE_LIMIT_AUTH_WINDOW_SECONDS,
};

/// Extract client identifier for rate limiting.
/// Uses X-Forwarded-For header if behind proxy, otherwise uses connection IP.
fn client_identifier(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
    {
        // first hop is the original client
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
    {
        return real_ip.to_string();
    }

    if let Some(connect_info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip().to_string();
    }

    "unknown".to_string()
}

async fn enforce(
    policy: Policy,
    state: AppState,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let client_id = client_identifier(&request);
    let key = format!("{}:{}", policy.scope, client_id);

    let (count, allowed) = match state
        .cache
        .check_rate_limit(&key, policy.limit, policy.window)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            // fail closed while Redis is unavailable
            tracing::error!(scope = policy.scope, error = %e, "Rate limit check failed - denying request");
            return Err(RateLimitError {
                retry_after: policy.window,
            });
        }
    };

    if !allowed {
        tracing::warn!(scope = policy.scope, client = %client_id, count, "Rate limit exceeded");
        return Err(RateLimitError {
            retry_after: policy.window,
        });
    }

    let mut response = next.run(request).await;

    let remaining = policy.limit.saturating_sub(count);
    response
        .headers_mut()
        .insert("X-RateLimit-Limit", HeaderValue::from(policy.limit));
    response
        .headers_mut()
        .insert("X-RateLimit-Remaining", HeaderValue::from(remaining));

    Ok(response)
}

/// General rate limiting middleware.
/// Limits requests to RATE_LIMIT_REQUESTS per RATE_LIMIT_WINDOW_SECONDS.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(GENERAL, state, request, next).await
}

/// Stricter rate limiting for authentication endpoints.
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(AUTH, state, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_rate_limit_error_response() {
        let error = RateLimitError { retry_after: 60 };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["Retry-After"], "60");
    }

    #[test]
    fn test_client_identifier_prefers_forwarded_for() {
        let request = Request::builder()
            .header("X-Forwarded-For", "10.0.0.1, 172.16.0.1")
            .header("X-Real-IP", "192.168.1.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identifier(&request), "10.0.0.1");
    }

    #[test]
    fn test_client_identifier_unknown() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_identifier(&request), "unknown");
    }
}
