//! Gateway configuration.
//!
//! All settings come from environment variables with sensible defaults, so
//! the gateway runs out of the box against a local movies service. The
//! config is built once at startup and shared immutably with handlers.

use crate::types::RateLimitPolicy;

/// Default listen address for the gateway.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

/// Default base URL of the upstream movies service.
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "http://localhost:8080/movies";

/// Default sustained rate for the `/rl` route, in requests per second.
pub const DEFAULT_RATELIMIT_RATE: u32 = 5;

/// Default burst capacity for the `/rl` route.
pub const DEFAULT_RATELIMIT_BURST: u32 = 10;

/// Default username accepted by the Basic-auth gate.
pub const DEFAULT_AUTH_USERNAME: &str = "user";

/// Default password accepted by the Basic-auth gate.
pub const DEFAULT_AUTH_PASSWORD: &str = "password";

/// Default timeout applied to upstream calls, in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Immutable gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the gateway listens on.
    pub listen_addr: String,
    /// Base URL of the upstream movies service.
    pub upstream_base_url: String,
    /// Rate limit applied to the `/rl` route.
    pub rate_limit: RateLimitPolicy,
    /// Credential accepted by the Basic-auth gate.
    pub auth: Credential,
    /// Timeout for upstream calls, in seconds.
    pub upstream_timeout_secs: u64,
}

/// The single static user credential.
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            rate_limit: RateLimitPolicy::new(DEFAULT_RATELIMIT_RATE, DEFAULT_RATELIMIT_BURST),
            auth: Credential {
                username: DEFAULT_AUTH_USERNAME.to_string(),
                password: DEFAULT_AUTH_PASSWORD.to_string(),
            },
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from the environment.
    ///
    /// Reads a `.env` file if one is present. Unparseable numeric values
    /// fall back to the defaults.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Build configuration from environment variables only.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: env_or("GATEWAY_LISTEN_ADDR", defaults.listen_addr),
            upstream_base_url: env_or("UPSTREAM_BASE_URL", defaults.upstream_base_url),
            rate_limit: RateLimitPolicy::new(
                env_parse_or("RATELIMIT_RATE", DEFAULT_RATELIMIT_RATE),
                env_parse_or("RATELIMIT_BURST", DEFAULT_RATELIMIT_BURST),
            ),
            auth: Credential {
                username: env_or("AUTH_USERNAME", defaults.auth.username),
                password: env_or("AUTH_PASSWORD", defaults.auth.password),
            },
            upstream_timeout_secs: env_parse_or(
                "UPSTREAM_TIMEOUT_SECS",
                DEFAULT_UPSTREAM_TIMEOUT_SECS,
            ),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.upstream_base_url, "http://localhost:8080/movies");
        assert_eq!(config.rate_limit.rate, 5);
        assert_eq!(config.rate_limit.burst, 10);
        assert_eq!(config.auth.username, "user");
        assert_eq!(config.auth.password, "password");
        assert_eq!(config.upstream_timeout_secs, 10);
    }

    #[test]
    fn test_from_env_overrides() {
        // SAFETY: test-local env mutation, keys are unique to this test
        unsafe {
            std::env::set_var("RATELIMIT_RATE", "7");
            std::env::set_var("RATELIMIT_BURST", "21");
        }

        let config = GatewayConfig::from_env();
        assert_eq!(config.rate_limit.rate, 7);
        assert_eq!(config.rate_limit.burst, 21);

        unsafe {
            std::env::remove_var("RATELIMIT_RATE");
            std::env::remove_var("RATELIMIT_BURST");
        }
    }

    #[test]
    fn test_unparseable_value_falls_back() {
        unsafe {
            std::env::set_var("UPSTREAM_TIMEOUT_SECS", "not-a-number");
        }

        let config = GatewayConfig::from_env();
        assert_eq!(config.upstream_timeout_secs, DEFAULT_UPSTREAM_TIMEOUT_SECS);

        unsafe {
            std::env::remove_var("UPSTREAM_TIMEOUT_SECS");
        }
    }
}
