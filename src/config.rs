use std::net::SocketAddr;

use crate::rate_limit::RateLimiterConfig;

/// Server configuration, environment-driven with sensible defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// How long issued session tokens stay valid
    pub session_ttl_days: i64,
    /// Maximum accepted request body size in bytes
    pub request_body_limit_bytes: usize,
    /// Rate limiting quotas
    pub rate_limit: RateLimiterConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            session_ttl_days: 30,
            request_body_limit_bytes: 1024 * 1024,
            rate_limit: RateLimiterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from environment variables, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("BIND_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.bind_addr);

        let session_ttl_days = std::env::var("SESSION_TTL_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.session_ttl_days);

        let request_body_limit_bytes = std::env::var("REQUEST_BODY_LIMIT_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.request_body_limit_bytes);

        let requests_per_minute = std::env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.rate_limit.requests_per_minute);

        let credential_requests_per_minute = std::env::var("CREDENTIAL_RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.rate_limit.credential_requests_per_minute);

        Self {
            bind_addr,
            session_ttl_days,
            request_body_limit_bytes,
            rate_limit: RateLimiterConfig {
                requests_per_minute,
                credential_requests_per_minute,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 3000)));
        assert_eq!(config.session_ttl_days, 30);
        assert_eq!(config.request_body_limit_bytes, 1024 * 1024);
    }
}
