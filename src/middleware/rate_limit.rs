//! Per-client-IP fixed-window rate limiting.
//!
//! The window map lives in process memory; this service is single-node by
//! design, so no shared cache backend is involved. Responses past the limit
//! carry the standard `X-RateLimit-*` and `Retry-After` headers.

use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::{Duration, Instant},
};

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{HeaderValue, StatusCode};
use parking_lot::Mutex;

use crate::{AppState, models::ApiError};

/// Window entries above this count trigger opportunistic pruning of expired
/// windows, bounding memory under IP churn.
const PRUNE_THRESHOLD: usize = 1024;

struct WindowState {
    started: Instant,
    count: u32,
}

/// Decision for a single request.
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Exceeded { limit: u32, retry_after_secs: u64 },
}

/// Fixed-window request counter keyed by client IP.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, WindowState>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request from `ip` against the current window.
    pub fn check(&self, ip: IpAddr) -> RateLimitDecision {
        let now = Instant::now();
        let mut windows = self.windows.lock();

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, state| now.duration_since(state.started) < self.window);
        }

        let state = windows.entry(ip).or_insert(WindowState {
            started: now,
            count: 0,
        });

        if now.duration_since(state.started) >= self.window {
            state.started = now;
            state.count = 0;
        }

        state.count += 1;

        if state.count > self.limit {
            let elapsed = now.duration_since(state.started);
            let retry_after_secs = self.window.saturating_sub(elapsed).as_secs().max(1);
            RateLimitDecision::Exceeded {
                limit: self.limit,
                retry_after_secs,
            }
        } else {
            RateLimitDecision::Allowed {
                remaining: self.limit - state.count,
            }
        }
    }
}

/// Reject requests from clients that exceed the configured per-minute limit.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limiter) = &state.rate_limiter else {
        return next.run(request).await;
    };

    let ip = client_ip(&request);
    match limiter.check(ip) {
        RateLimitDecision::Allowed { .. } => next.run(request).await,
        RateLimitDecision::Exceeded {
            limit,
            retry_after_secs,
        } => {
            tracing::warn!(%ip, limit, "rate limit exceeded");

            let body = ApiError::new(format!(
                "Rate limit exceeded: {limit} requests per minute"
            ));
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::try_from(limit.to_string()) {
                headers.insert("X-RateLimit-Limit", value);
            }
            headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
            if let Ok(value) = HeaderValue::try_from(retry_after_secs.to_string()) {
                headers.insert("Retry-After", value);
            }

            response
        }
    }
}

/// Best-effort client IP: `X-Forwarded-For` first, then the socket address.
fn client_ip(request: &Request) -> IpAddr {
    if let Some(forwarded) = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(ip) = forwarded
            .split(',')
            .next()
            .and_then(|first| first.trim().parse().ok())
        {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::test_app;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        for expected_remaining in [2, 1, 0] {
            match limiter.check(ip) {
                RateLimitDecision::Allowed { remaining } => {
                    assert_eq!(remaining, expected_remaining);
                }
                RateLimitDecision::Exceeded { .. } => panic!("rejected below the limit"),
            }
        }

        match limiter.check(ip) {
            RateLimitDecision::Exceeded {
                limit,
                retry_after_secs,
            } => {
                assert_eq!(limit, 3);
                assert!(retry_after_secs >= 1);
            }
            RateLimitDecision::Allowed { .. } => panic!("allowed above the limit"),
        }
    }

    #[test]
    fn windows_are_tracked_per_ip() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let first: IpAddr = "10.0.0.1".parse().unwrap();
        let second: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(matches!(
            limiter.check(first),
            RateLimitDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check(second),
            RateLimitDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check(first),
            RateLimitDecision::Exceeded { .. }
        ));
    }

    #[test]
    fn expired_window_resets_the_count() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(matches!(
            limiter.check(ip),
            RateLimitDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check(ip),
            RateLimitDecision::Exceeded { .. }
        ));

        std::thread::sleep(Duration::from_millis(30));
        assert!(matches!(
            limiter.check(ip),
            RateLimitDecision::Allowed { .. }
        ));
    }

    #[tokio::test]
    async fn over_limit_requests_get_429_with_headers() {
        let app = test_app("[limits]\nrequests_per_minute = 2\n");

        for _ in 0..2 {
            let request = http::Request::builder()
                .method("GET")
                .uri("/models")
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let request = http::Request::builder()
            .method("GET")
            .uri("/models")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get("X-RateLimit-Limit").unwrap(),
            &HeaderValue::from_static("2")
        );
        assert_eq!(
            response.headers().get("X-RateLimit-Remaining").unwrap(),
            &HeaderValue::from_static("0")
        );
        assert!(response.headers().contains_key("Retry-After"));
    }

    #[tokio::test]
    async fn health_endpoints_are_not_rate_limited() {
        let app = test_app("[limits]\nrequests_per_minute = 1\n");

        for _ in 0..3 {
            let request = http::Request::builder()
                .method("GET")
                .uri("/health/live")
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn forwarded_clients_are_limited_independently() {
        let app = test_app("[limits]\nrequests_per_minute = 1\n");

        for ip in ["203.0.113.1", "203.0.113.2"] {
            let request = http::Request::builder()
                .method("GET")
                .uri("/models")
                .header("X-Forwarded-For", ip)
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let request = http::Request::builder()
            .method("GET")
            .uri("/models")
            .header("X-Forwarded-For", "203.0.113.1")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
