//! The gateway router.
//!
//! Holds the ordered route table and dispatches each inbound request
//! through a first-match loop: authentication gate, then the rule's
//! filter chain, then the terminal action (local titles projection or
//! reverse-proxy forward). Unmatched paths get a 404.

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::auth::AuthGate;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::limiter::RateLimiter;
use crate::proxy;
use crate::types::{Movie, RouteAction, RouteRule};
use crate::upstream::UpstreamClient;

/// A request filter applied once a route has matched and the auth gate
/// has run. Filters are applied in order; the first rejection wins.
#[async_trait]
pub trait GatewayFilter: Send + Sync {
    /// Admit or reject the request. `client` is the identity the request
    /// runs as: the authenticated username, or the peer address on
    /// unauthenticated routes.
    async fn apply(&self, client: &str) -> Result<(), GatewayError>;
}

/// Filter enforcing a per-client rate limit.
pub struct RateLimitFilter {
    limiter: RateLimiter,
}

impl RateLimitFilter {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl GatewayFilter for RateLimitFilter {
    async fn apply(&self, client: &str) -> Result<(), GatewayError> {
        self.limiter.check(client)
    }
}

/// A route rule together with its instantiated filter chain.
struct RouteEntry {
    rule: RouteRule,
    filters: Vec<Arc<dyn GatewayFilter>>,
}

/// The gateway: configuration, upstream client, and the ordered route
/// table. Built once at startup and shared behind an [`Arc`].
pub struct Gateway {
    routes: Vec<RouteEntry>,
    auth: AuthGate,
    upstream: UpstreamClient,
    limiters: Vec<RateLimiter>,
}

impl Gateway {
    /// Build the gateway from configuration.
    ///
    /// The route table, in match order:
    ///
    /// | Path      | Auth | Filters               | Action          |
    /// |-----------|------|-----------------------|-----------------|
    /// | `/titles` | no   | none                  | local titles    |
    /// | `/proxy`  | no   | none                  | forward         |
    /// | `/rl`     | yes  | rate limiter          | forward         |
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(
            config.upstream_base_url.clone(),
            Duration::from_secs(config.upstream_timeout_secs),
        )?;

        let rules = vec![
            RouteRule {
                path_prefix: "/titles".to_string(),
                requires_auth: false,
                policy: None,
                action: RouteAction::Titles,
            },
            RouteRule {
                path_prefix: "/proxy".to_string(),
                requires_auth: false,
                policy: None,
                action: RouteAction::Forward,
            },
            RouteRule {
                path_prefix: "/rl".to_string(),
                requires_auth: true,
                policy: Some(config.rate_limit),
                action: RouteAction::Forward,
            },
        ];

        Ok(Self::with_rules(config, upstream, rules))
    }

    /// Build a gateway with an explicit rule list.
    fn with_rules(config: &GatewayConfig, upstream: UpstreamClient, rules: Vec<RouteRule>) -> Self {
        let mut limiters = Vec::new();
        let routes = rules
            .into_iter()
            .map(|rule| {
                let mut filters: Vec<Arc<dyn GatewayFilter>> = Vec::new();
                if let Some(policy) = rule.policy {
                    let limiter = RateLimiter::new(policy);
                    limiters.push(limiter.clone());
                    filters.push(Arc::new(RateLimitFilter::new(limiter)));
                }
                RouteEntry { rule, filters }
            })
            .collect();

        Self {
            routes,
            auth: AuthGate::new(config.auth.clone()),
            upstream,
            limiters,
        }
    }

    /// Drop recovered per-client limiter state.
    pub fn cleanup_limiters(&self) {
        for limiter in &self.limiters {
            limiter.cleanup();
        }
        let tracked: usize = self.limiters.iter().map(RateLimiter::tracked_clients).sum();
        tracing::debug!(tracked, "limiter state after cleanup");
    }

    /// Serve the streaming titles projection.
    ///
    /// The response starts as soon as the upstream connection is accepted;
    /// titles stream out one line at a time, in upstream delivery order.
    /// Records without a title and records that fail to decode are
    /// skipped.
    async fn titles(&self) -> Result<Response, GatewayError> {
        let movies = self.upstream.fetch_movies().await?;

        let lines = movies.filter_map(|item| async move {
            match item {
                Ok(Movie {
                    title: Some(title), ..
                }) => Some(Ok::<_, Infallible>(Bytes::from(format!("{title}\n")))),
                Ok(_) => {
                    tracing::debug!("skipping movie record without a title");
                    None
                }
                Err(GatewayError::Decode(e)) => {
                    tracing::warn!(error = %e, "skipping undecodable movie record");
                    None
                }
                Err(e) => {
                    // Transport failure mid-stream; the 200 status is
                    // already committed, so the body just ends early
                    tracing::warn!(error = %e, "upstream stream failed mid-flight");
                    None
                }
            }
        });

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Body::from_stream(lines))
            .expect("static response head is valid");
        Ok(response)
    }

    /// Run one request through the first-match loop.
    async fn dispatch(
        &self,
        client_addr: Option<SocketAddr>,
        req: Request,
    ) -> Result<Response, GatewayError> {
        let path = req.uri().path().to_string();

        for entry in &self.routes {
            if !entry.rule.matches(&path) {
                continue;
            }

            let client = if entry.rule.requires_auth {
                self.auth.authenticate(req.headers())?
            } else {
                client_addr
                    .map(|a| a.ip().to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            };

            for filter in &entry.filters {
                filter.apply(&client).await?;
            }

            return match entry.rule.action {
                RouteAction::Titles => {
                    if req.method() != axum::http::Method::GET {
                        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
                    }
                    self.titles().await
                }
                RouteAction::Forward => {
                    let suffix = req
                        .uri()
                        .path_and_query()
                        .map(|pq| pq.as_str()[entry.rule.path_prefix.len()..].to_string())
                        .unwrap_or_default();
                    proxy::forward(&self.upstream, &suffix, req).await
                }
            };
        }

        tracing::debug!(%path, "no route matched");
        Ok(StatusCode::NOT_FOUND.into_response())
    }
}

/// Build the axum application around a gateway.
///
/// Dispatch is a single fallback handler running the ordered first-match
/// loop, so route precedence lives in one place.
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .fallback(handle)
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

async fn handle(
    State(gateway): State<Arc<Gateway>>,
    client_addr: Option<ConnectInfo<SocketAddr>>,
    req: Request,
) -> Response {
    match gateway.dispatch(client_addr.map(|c| c.0), req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RateLimitPolicy;

    fn test_gateway(config: &GatewayConfig) -> Arc<Gateway> {
        Arc::new(Gateway::new(config).unwrap())
    }

    #[test]
    fn test_route_table_order() {
        let config = GatewayConfig::default();
        let gateway = test_gateway(&config);

        let prefixes: Vec<_> = gateway
            .routes
            .iter()
            .map(|e| e.rule.path_prefix.as_str())
            .collect();
        assert_eq!(prefixes, vec!["/titles", "/proxy", "/rl"]);
    }

    #[test]
    fn test_only_rl_route_is_protected() {
        let config = GatewayConfig::default();
        let gateway = test_gateway(&config);

        for entry in &gateway.routes {
            let protected = entry.rule.path_prefix == "/rl";
            assert_eq!(entry.rule.requires_auth, protected);
            assert_eq!(!entry.filters.is_empty(), protected);
        }
    }

    #[test]
    fn test_rl_limiter_uses_configured_policy() {
        let mut config = GatewayConfig::default();
        config.rate_limit = RateLimitPolicy::new(3, 4);
        let gateway = test_gateway(&config);

        assert_eq!(gateway.limiters.len(), 1);
        assert_eq!(gateway.limiters[0].policy(), config.rate_limit);
    }

    #[tokio::test]
    async fn test_rate_limit_filter_rejects_after_burst() {
        let filter = RateLimitFilter::new(RateLimiter::new(RateLimitPolicy::new(5, 2)));

        filter.apply("alice").await.unwrap();
        filter.apply("alice").await.unwrap();
        let err = filter.apply("alice").await.unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited(_)));

        // Another identity is unaffected
        filter.apply("bob").await.unwrap();
    }
}
