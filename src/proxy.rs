//! Transparent reverse-proxy forwarding.
//!
//! Passes the inbound request through to the upstream and relays the
//! upstream response back unmodified, apart from hop-by-hop headers,
//! which belong to each individual connection and must not cross the
//! proxy.

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use http::{HeaderMap, HeaderName, header};

use crate::error::GatewayError;
use crate::upstream::UpstreamClient;

/// Hop-by-hop headers, per RFC 9110 §7.6.1, plus `Host` (rewritten by the
/// client for the upstream connection).
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Forward a request to the upstream and relay the response.
///
/// `path_suffix` is whatever followed the matched route prefix (including
/// a query string, if any); it is appended to the upstream base URL so
/// `/proxy/123?x=1` reaches `<base>/123?x=1`.
pub async fn forward(
    upstream: &UpstreamClient,
    path_suffix: &str,
    req: Request,
) -> Result<Response, GatewayError> {
    let (parts, body) = req.into_parts();

    let url = format!("{}{}", upstream.base_url(), path_suffix);
    tracing::debug!(method = %parts.method, %url, "forwarding to upstream");

    let upstream_response = upstream
        .http()
        .request(parts.method, url)
        .headers(end_to_end_headers(&parts.headers))
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await
        .map_err(GatewayError::from_upstream)?;

    let status = upstream_response.status();
    let headers = end_to_end_headers(upstream_response.headers());

    let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Copy a header map, dropping hop-by-hop headers and `Host`.
fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == header::HOST || HOP_BY_HOP.contains(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_hop_by_hop_headers_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::HOST, HeaderValue::from_static("gateway.local"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert("x-custom", HeaderValue::from_static("kept"));

        let out = end_to_end_headers(&headers);

        assert!(out.get(header::CONNECTION).is_none());
        assert!(out.get(header::TRANSFER_ENCODING).is_none());
        assert!(out.get(header::UPGRADE).is_none());
        assert!(out.get(header::HOST).is_none());
        assert_eq!(out.get(header::ACCEPT).unwrap(), "*/*");
        assert_eq!(out.get("x-custom").unwrap(), "kept");
    }

    #[test]
    fn test_repeated_header_values_preserved() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));

        let out = end_to_end_headers(&headers);
        let values: Vec<_> = out.get_all("x-tag").iter().collect();
        assert_eq!(values, vec!["a", "b"]);
    }
}
