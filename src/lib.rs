//! Streaming reverse-proxy gateway for a movies API.
//!
//! This crate fronts an upstream movies service with three routes:
//!
//! - **`GET /titles`** — handled locally: the upstream movie list is
//!   decoded incrementally and each record's title streams back as one
//!   plain-text line, in upstream delivery order, without buffering the
//!   full list.
//! - **`/proxy`** — transparent reverse proxy to the upstream: method,
//!   headers, and body pass through; the upstream response is relayed
//!   unmodified (hop-by-hop headers excepted).
//! - **`/rl`** — like `/proxy`, but guarded by HTTP Basic authentication
//!   and a per-client rate limit (GCRA token bucket, rate 5/s and burst
//!   10 by default).
//!
//! # Route Matching Behavior
//!
//! Routes are held in an ordered table and matched by path prefix at
//! segment boundaries, first match wins: `/rl` matches `/rl` and
//! `/rl/anything` but not `/rles`. Unmatched paths get a 404.
//!
//! # Error Mapping
//!
//! Upstream connect failures map to 502, upstream timeouts to 504,
//! missing or bad credentials to 401 with a `WWW-Authenticate`
//! challenge, and an exhausted rate budget to 429 with `Retry-After`.
//! A single undecodable upstream record is skipped and logged; it never
//! aborts an otherwise healthy stream.
//!
//! # Example
//!
//! ```rust,no_run
//! use movies_gateway::{Gateway, GatewayConfig, router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::load();
//! let gateway = Arc::new(Gateway::new(&config)?);
//! let app = router(gateway);
//!
//! let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
//! axum::serve(
//!     listener,
//!     app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod config;
mod decode;
mod error;
mod gateway;
mod gcra;
mod limiter;
mod proxy;
mod types;
mod upstream;

// Public re-exports
pub use auth::AuthGate;
pub use config::{Credential, GatewayConfig};
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayFilter, RateLimitFilter, router};
pub use limiter::RateLimiter;
pub use types::{Movie, RateLimitPolicy, RouteAction, RouteRule};
pub use upstream::{MovieStream, UpstreamClient};
