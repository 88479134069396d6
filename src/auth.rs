//! HTTP Basic authentication gate.
//!
//! Validates credentials against the single configured user. Every request
//! is checked independently; there are no sessions.

use axum::http::{HeaderMap, header};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::config::Credential;
use crate::error::GatewayError;

/// Stateless per-request Basic-auth check.
#[derive(Debug, Clone)]
pub struct AuthGate {
    credential: Credential,
}

impl AuthGate {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    /// Authenticate a request from its headers.
    ///
    /// Returns the authenticated username, or [`GatewayError::Auth`] when
    /// the header is missing, malformed, or carries the wrong credentials.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<String, GatewayError> {
        let header = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(GatewayError::Auth)?;

        let encoded = header.strip_prefix("Basic ").ok_or(GatewayError::Auth)?;
        let decoded = BASE64.decode(encoded.trim()).map_err(|_| GatewayError::Auth)?;
        let decoded = String::from_utf8(decoded).map_err(|_| GatewayError::Auth)?;

        // Credentials are "username:password"; the password may itself
        // contain colons, so split only at the first one
        let (username, password) = decoded.split_once(':').ok_or(GatewayError::Auth)?;

        if username == self.credential.username && password == self.credential.password {
            Ok(username.to_string())
        } else {
            tracing::debug!(username, "rejected basic auth attempt");
            Err(GatewayError::Auth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn gate() -> AuthGate {
        AuthGate::new(Credential {
            username: "user".to_string(),
            password: "password".to_string(),
        })
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn basic(creds: &str) -> String {
        format!("Basic {}", BASE64.encode(creds))
    }

    #[test]
    fn test_valid_credentials() {
        let headers = headers_with(&basic("user:password"));
        assert_eq!(gate().authenticate(&headers).unwrap(), "user");
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            gate().authenticate(&HeaderMap::new()),
            Err(GatewayError::Auth)
        ));
    }

    #[test]
    fn test_wrong_password() {
        let headers = headers_with(&basic("user:wrong"));
        assert!(gate().authenticate(&headers).is_err());
    }

    #[test]
    fn test_wrong_username() {
        let headers = headers_with(&basic("admin:password"));
        assert!(gate().authenticate(&headers).is_err());
    }

    #[test]
    fn test_wrong_scheme() {
        let headers = headers_with("Bearer abcdef");
        assert!(gate().authenticate(&headers).is_err());
    }

    #[test]
    fn test_invalid_base64() {
        let headers = headers_with("Basic not!!valid$$base64");
        assert!(gate().authenticate(&headers).is_err());
    }

    #[test]
    fn test_password_containing_colon() {
        let gate = AuthGate::new(Credential {
            username: "user".to_string(),
            password: "pa:ss".to_string(),
        });
        let headers = headers_with(&basic("user:pa:ss"));
        assert_eq!(gate.authenticate(&headers).unwrap(), "user");
    }
}
