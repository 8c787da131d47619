//! Bearer-authenticated calls to the content/admin backend.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use crate::offline::OfflineMode;
use crate::session_store::SessionStore;
use crate::transport::{HttpEndpoint, TransportError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No session, or the backend refused it. The session has been cleared;
    /// the calling view must re-run its access decision.
    #[error("not authenticated")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Calls made on behalf of the logged-in user.
///
/// Shares the session store with the identity client: a 401 here ends the
/// session exactly like a rejected verify does.
#[derive(Clone)]
pub struct AuthenticatedApi {
    endpoint: HttpEndpoint,
    store: Arc<dyn SessionStore>,
    offline: Arc<OfflineMode>,
}

impl AuthenticatedApi {
    pub fn new(
        endpoint: HttpEndpoint,
        store: Arc<dyn SessionStore>,
        offline: Arc<OfflineMode>,
    ) -> Self {
        Self {
            endpoint,
            store,
            offline,
        }
    }

    pub async fn get(&self, action: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.request(Method::GET, action, params, None).await
    }

    pub async fn post(&self, action: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::POST, action, &[], Some(body)).await
    }

    pub async fn put(&self, action: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::PUT, action, &[], Some(body)).await
    }

    pub async fn delete(&self, action: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.request(Method::DELETE, action, params, None).await
    }

    async fn request(
        &self,
        method: Method,
        action: &str,
        params: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let Some(session) = self.store.load() else {
            return Err(ApiError::Unauthorized);
        };

        let resp = match self
            .endpoint
            .call(method.clone(), action, params, Some(&session.token), body)
            .await
        {
            Ok(resp) => {
                self.offline.set_online();
                resp
            }
            Err(err) => {
                self.offline.set_offline();
                tracing::warn!(%method, action, "content backend unreachable: {err}");
                return Err(err.into());
            }
        };

        if resp.is_success() {
            return Ok(resp.body);
        }

        if resp.is_unauthorized() {
            tracing::info!(action, "session refused by content backend; clearing");
            // Only end the session the request was made with.
            if self
                .store
                .load()
                .is_some_and(|current| current.token == session.token)
            {
                if let Err(err) = self.store.clear() {
                    tracing::error!("failed to clear session after 401: {err:?}");
                }
            }
            return Err(ApiError::Unauthorized);
        }

        let message = resp
            .error_message()
            .unwrap_or_else(|| format!("request failed with status {}", resp.status));

        if resp.is_forbidden() {
            tracing::warn!(action, user_id = %session.user.id, "forbidden: {message}");
            return Err(ApiError::Forbidden(message));
        }

        tracing::warn!(%method, action, status = resp.status, "backend error: {message}");
        Err(ApiError::Backend {
            status: resp.status,
            message,
        })
    }
}
