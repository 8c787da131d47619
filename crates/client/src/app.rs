//! Wiring of the client's shared services.

use std::sync::Arc;

use anyhow::Context;

use crate::api::AuthenticatedApi;
use crate::config::ClientConfig;
use crate::guard::AccessGuard;
use crate::identity::IdentityClient;
use crate::offline::OfflineMode;
use crate::session_store::{FileSessionStore, SessionStore};
use crate::transport::{HttpEndpoint, HttpIdentityBackend};
use crate::views::{ProtectedView, ViewController};

/// Services shared by every command and view.
///
/// The identity client and the authenticated API share one session store and
/// one connectivity tracker.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub offline: Arc<OfflineMode>,
    pub identity: Arc<IdentityClient>,
    pub api: Arc<AuthenticatedApi>,
    pub guard: AccessGuard,
}

impl AppState {
    /// Build the HTTP-backed state described by `config`.
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let session_path = config
            .session_path()
            .context("failed to resolve session path")?;
        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(session_path));

        let identity_endpoint = HttpEndpoint::new(
            config.auth_url.clone(),
            &config.token_header,
            config.request_timeout(),
        )
        .context("failed to build identity endpoint")?;
        let api_endpoint = HttpEndpoint::new(
            config.api_url.clone(),
            &config.token_header,
            config.request_timeout(),
        )
        .context("failed to build content endpoint")?;

        Ok(Self::with_parts(
            store,
            Arc::new(HttpIdentityBackend::new(identity_endpoint)),
            api_endpoint,
        ))
    }

    /// Assemble from explicit parts (tests use an in-memory store).
    pub fn with_parts(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn crate::transport::IdentityBackend>,
        api_endpoint: HttpEndpoint,
    ) -> Self {
        let offline = Arc::new(OfflineMode::new());
        let identity = Arc::new(
            IdentityClient::new(backend, store.clone()).with_offline_mode(offline.clone()),
        );
        let api = Arc::new(AuthenticatedApi::new(
            api_endpoint,
            store.clone(),
            offline.clone(),
        ));
        let guard = AccessGuard::new(identity.clone());

        tracing::debug!("client state assembled");
        Self {
            store,
            offline,
            identity,
            api,
            guard,
        }
    }

    /// Fresh controller for one mount of `view`.
    pub fn controller(&self, view: ProtectedView) -> ViewController {
        ViewController::new(view, self.guard.clone())
    }
}
