//! Error types for the gateway.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while handling a gateway request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The upstream service was unreachable or closed the connection.
    #[error("upstream connection failed: {0}")]
    Connection(#[source] reqwest::Error),

    /// The upstream call exceeded the configured timeout.
    #[error("upstream request timed out")]
    UpstreamTimeout,

    /// A single upstream record could not be decoded.
    ///
    /// Isolated to the affected record: the surrounding stream continues.
    #[error("failed to decode upstream record: {0}")]
    Decode(#[source] serde_json::Error),

    /// Missing or invalid credentials on a protected route.
    #[error("authentication required")]
    Auth,

    /// The client exceeded its rate limit budget.
    #[error("rate limit exceeded, retry after {0:?}")]
    RateLimited(Duration),
}

impl GatewayError {
    /// Classify a reqwest failure as timeout or connection error.
    pub(crate) fn from_upstream(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::UpstreamTimeout
        } else {
            GatewayError::Connection(err)
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::Connection(e) => {
                tracing::warn!(error = %e, "upstream connection failed");
                StatusCode::BAD_GATEWAY
            }
            GatewayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            // Decode errors are skipped per record and never produce a
            // response on their own; if one surfaces here the upstream
            // payload was unusable as a whole.
            GatewayError::Decode(e) => {
                tracing::warn!(error = %e, "upstream payload could not be decoded");
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Auth => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        }));

        let mut response = (status, body).into_response();
        match self {
            GatewayError::Auth => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"gateway\""),
                );
            }
            GatewayError::RateLimited(retry_after) => {
                // Whole seconds, rounded up, so a client honoring the
                // header never retries early.
                let secs = retry_after.as_secs_f64().ceil() as u64;
                if let Ok(value) = HeaderValue::from_str(&secs.max(1).to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            _ => {}
        }
        response
    }
}
