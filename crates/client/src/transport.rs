//! Wire-level access to the identity and content backends.
//!
//! Both backends are single endpoints that pick the operation from an
//! `action` query parameter and speak JSON. Errors come back as `{"error": ..}`.
//! This layer only moves bytes and classifies "no response"; what a status
//! code means is decided by the callers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderName;
use serde_json::Value;
use storefront_auth::AuthToken;
use thiserror::Error;

/// Operations exposed by the identity backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Register,
    Login,
    Logout,
    Verify,
    ChangePassword,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Register => "register",
            Action::Login => "login",
            Action::Logout => "logout",
            Action::Verify => "verify",
            Action::ChangePassword => "change-password",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Action::Verify => Method::GET,
            _ => Method::POST,
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response that did arrive, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: u16,
    /// Decoded JSON body; `Value::Null` when the body was empty or not JSON.
    pub body: Value,
}

impl BackendResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    /// Backend-supplied `error` message, if it sent a non-blank one.
    pub fn error_message(&self) -> Option<String> {
        self.body
            .get("error")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|msg| !msg.is_empty())
            .map(str::to_owned)
    }
}

/// No usable response came back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("invalid request: {0}")]
    Request(String),
}

impl TransportError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Request(err.to_string())
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}

/// Identity backend seam; the HTTP implementation is swapped for a fake in tests.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    async fn send(
        &self,
        action: Action,
        token: Option<&AuthToken>,
        body: Option<&Value>,
    ) -> Result<BackendResponse, TransportError>;
}

/// One `?action=`-routed JSON endpoint reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
    token_header: HeaderName,
}

impl HttpEndpoint {
    pub fn new(
        url: impl Into<String>,
        token_header: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let token_header = HeaderName::from_bytes(token_header.as_bytes())
            .map_err(|e| TransportError::Request(format!("invalid token header: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            token_header,
        })
    }

    /// Perform one exchange. Only "no response" is an error here.
    pub async fn call(
        &self,
        method: Method,
        action: &str,
        params: &[(&str, &str)],
        token: Option<&AuthToken>,
        body: Option<&Value>,
    ) -> Result<BackendResponse, TransportError> {
        let mut req = self
            .client
            .request(method, &self.url)
            .query(&[("action", action)])
            .query(params);

        if let Some(token) = token {
            req = req.header(self.token_header.clone(), token.bearer());
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(TransportError::from_reqwest)?;
        let status = resp.status().as_u16();

        // The status is what callers act on; a body that fails to arrive or
        // decode is treated as empty.
        let body = match resp.bytes().await {
            Ok(bytes) if bytes.is_empty() => Value::Null,
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                tracing::debug!(action, status, "non-JSON response body: {err}");
                Value::Null
            }),
            Err(err) => {
                tracing::debug!(action, status, "failed to read response body: {err}");
                Value::Null
            }
        };

        Ok(BackendResponse::new(status, body))
    }
}

/// Identity backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIdentityBackend {
    endpoint: HttpEndpoint,
}

impl HttpIdentityBackend {
    pub fn new(endpoint: HttpEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl IdentityBackend for HttpIdentityBackend {
    async fn send(
        &self,
        action: Action,
        token: Option<&AuthToken>,
        body: Option<&Value>,
    ) -> Result<BackendResponse, TransportError> {
        self.endpoint
            .call(action.method(), action.as_str(), &[], token, body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_map_to_wire_names_and_methods() {
        assert_eq!(Action::ChangePassword.as_str(), "change-password");
        assert_eq!(Action::Verify.method(), Method::GET);
        assert_eq!(Action::Logout.method(), Method::POST);
    }

    #[test]
    fn error_message_ignores_blank_and_missing() {
        let resp = BackendResponse::new(400, json!({"error": "  Wrong password "}));
        assert_eq!(resp.error_message().as_deref(), Some("Wrong password"));

        let resp = BackendResponse::new(400, json!({"error": "   "}));
        assert_eq!(resp.error_message(), None);

        let resp = BackendResponse::new(500, Value::Null);
        assert_eq!(resp.error_message(), None);

        let resp = BackendResponse::new(400, json!({"error": 17}));
        assert_eq!(resp.error_message(), None);
    }

    #[test]
    fn status_classes() {
        assert!(BackendResponse::new(201, Value::Null).is_success());
        assert!(!BackendResponse::new(302, Value::Null).is_success());
        assert!(BackendResponse::new(401, Value::Null).is_unauthorized());
        assert!(BackendResponse::new(403, Value::Null).is_forbidden());
    }

    #[test]
    fn rejects_invalid_header_name() {
        let err = HttpEndpoint::new("http://localhost", "bad header", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }
}
