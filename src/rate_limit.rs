use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum requests per minute across the API
    pub requests_per_minute: u32,
    /// Tighter cap for the credential endpoints (register/login)
    pub credential_requests_per_minute: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 300,
            credential_requests_per_minute: 10,
        }
    }
}

/// Global rate limiter
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

fn limiter(requests_per_minute: u32) -> GlobalRateLimiter {
    let quota = Quota::per_minute(
        NonZeroU32::new(requests_per_minute).expect("Requests per minute must be non-zero"),
    );
    Arc::new(RateLimiter::direct(quota))
}

/// Limiter for the general API surface
pub fn create_api_limiter(config: &RateLimiterConfig) -> GlobalRateLimiter {
    limiter(config.requests_per_minute)
}

/// Limiter for register/login, where brute-forcing is the concern
pub fn create_credential_limiter(config: &RateLimiterConfig) -> GlobalRateLimiter {
    limiter(config.credential_requests_per_minute)
}

/// Middleware to apply rate limiting
pub async fn rate_limit_middleware(
    limiter: GlobalRateLimiter,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!("Rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please try again later.",
            )
                .into_response()
        }
    }
}
