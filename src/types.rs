//! Core types for gateway configuration.

use serde::Deserialize;

/// A single record from the upstream movies service.
///
/// Both fields are optional; upstream rows with a missing `title` are
/// skipped by the titles projection.
#[derive(Debug, Clone, Deserialize)]
pub struct Movie {
    pub id: Option<String>,
    pub title: Option<String>,
}

/// A rate limit policy: sustained replenish rate and burst capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Tokens replenished per second (sustained request rate).
    pub rate: u32,
    /// Maximum burst capacity.
    pub burst: u32,
}

impl RateLimitPolicy {
    /// Create a new policy.
    ///
    /// # Panics
    ///
    /// Panics if `rate` or `burst` is 0.
    pub fn new(rate: u32, burst: u32) -> Self {
        assert!(rate > 0, "rate must be greater than 0");
        assert!(burst > 0, "burst must be greater than 0");
        Self { rate, burst }
    }

    /// Time between token replenishments, in nanoseconds.
    #[inline]
    pub(crate) fn emission_interval_nanos(&self) -> u64 {
        1_000_000_000 / u64::from(self.rate)
    }

    /// Total burst tolerance, in nanoseconds.
    #[inline]
    pub(crate) fn burst_tolerance_nanos(&self) -> u64 {
        self.emission_interval_nanos() * u64::from(self.burst)
    }
}

/// What the gateway does with a matched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Reverse-proxy the request to the upstream base URL.
    Forward,
    /// Serve the streaming titles projection locally.
    Titles,
}

/// A route rule: a path predicate plus the handler chain applied to it.
#[derive(Debug, Clone)]
pub struct RouteRule {
    /// Path prefix to match (e.g., "/rl").
    pub path_prefix: String,
    /// Whether the request must pass the Basic-auth gate first.
    pub requires_auth: bool,
    /// Optional rate limit applied after authentication.
    pub policy: Option<RateLimitPolicy>,
    /// Terminal action once all filters pass.
    pub action: RouteAction,
}

impl RouteRule {
    /// Check if this rule matches a request path.
    ///
    /// Path prefix matching uses path segment boundaries:
    /// - "/rl" matches "/rl", "/rl/", "/rl/123"
    /// - "/rl" does NOT match "/rles" or "/rl-test"
    #[inline]
    pub fn matches(&self, path: &str) -> bool {
        if !path.starts_with(&self.path_prefix) {
            return false;
        }
        let remaining = &path[self.path_prefix.len()..];
        remaining.is_empty() || remaining.starts_with('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(prefix: &str) -> RouteRule {
        RouteRule {
            path_prefix: prefix.to_string(),
            requires_auth: false,
            policy: None,
            action: RouteAction::Forward,
        }
    }

    #[test]
    fn test_rule_matching_segment_boundary() {
        let r = rule("/rl");

        assert!(r.matches("/rl"), "/rl should match /rl");
        assert!(r.matches("/rl/"), "/rl should match /rl/");
        assert!(r.matches("/rl/123"), "/rl should match /rl/123");

        assert!(!r.matches("/rles"), "/rl should NOT match /rles");
        assert!(!r.matches("/rl-test"), "/rl should NOT match /rl-test");
        assert!(!r.matches("/proxy"), "/rl should NOT match /proxy");
    }

    #[test]
    fn test_rule_matching_nested_prefix() {
        let r = rule("/api/v1");

        assert!(r.matches("/api/v1/users"));
        assert!(!r.matches("/api/v2/users"));
    }

    #[test]
    fn test_emission_interval() {
        let policy = RateLimitPolicy::new(5, 10);
        assert_eq!(policy.emission_interval_nanos(), 200_000_000);
        assert_eq!(policy.burst_tolerance_nanos(), 2_000_000_000);
    }

    #[test]
    #[should_panic(expected = "rate must be greater than 0")]
    fn test_zero_rate_panics() {
        RateLimitPolicy::new(0, 10);
    }

    #[test]
    #[should_panic(expected = "burst must be greater than 0")]
    fn test_zero_burst_panics() {
        RateLimitPolicy::new(5, 0);
    }

    #[test]
    fn test_movie_decodes_with_missing_fields() {
        let m: Movie = serde_json::from_str(r#"{"id":"1"}"#).unwrap();
        assert_eq!(m.id.as_deref(), Some("1"));
        assert!(m.title.is_none());

        let m: Movie = serde_json::from_str("{}").unwrap();
        assert!(m.id.is_none());
        assert!(m.title.is_none());
    }
}
