//! Identity client: register, login, logout, verify and change-password
//! against the identity backend, keeping the session store in step.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use storefront_auth::{AuthToken, CredentialChange, InvalidReason, Session, User, Verification};
use tracing::instrument;

use crate::error::{
    AUTHENTICATION_REQUIRED, IdentityError, LOGIN_FAILED, PASSWORD_CHANGE_FAILED,
    REGISTRATION_FAILED,
};
use crate::offline::{ConnectivityState, OfflineMode};
use crate::session_store::SessionStore;
use crate::transport::{Action, BackendResponse, IdentityBackend, TransportError};

/// Success payload of `register` and `login`.
#[derive(Deserialize)]
struct SessionPayload {
    token: AuthToken,
    user: User,
}

/// Client for the identity backend.
///
/// The session store is only written after the backend confirmed the
/// identity, and is cleared whenever the backend refuses the cached token.
#[derive(Clone)]
pub struct IdentityClient {
    backend: Arc<dyn IdentityBackend>,
    store: Arc<dyn SessionStore>,
    offline: Arc<OfflineMode>,
}

impl IdentityClient {
    pub fn new(backend: Arc<dyn IdentityBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            backend,
            store,
            offline: Arc::new(OfflineMode::new()),
        }
    }

    /// Share a connectivity tracker with other clients.
    pub fn with_offline_mode(mut self, offline: Arc<OfflineMode>) -> Self {
        self.offline = offline;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn offline_mode(&self) -> &Arc<OfflineMode> {
        &self.offline
    }

    /// Whether the last backend exchange got any response.
    pub fn connectivity(&self) -> ConnectivityState {
        self.offline.state()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(skip(self, email, password, full_name, phone), fields(email = %email), err)]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Session, IdentityError> {
        let mut body = json!({ "email": email, "password": password });
        if let Some(full_name) = full_name {
            body["full_name"] = json!(full_name);
        }
        if let Some(phone) = phone {
            body["phone"] = json!(phone);
        }

        let resp = self
            .exchange(Action::Register, None, Some(&body))
            .await
            .map_err(|_| IdentityError::Registration(REGISTRATION_FAILED.to_string()))?;

        let session = self.establish(resp, IdentityError::Registration, REGISTRATION_FAILED)?;
        tracing::info!(user_id = %session.user.id, "registered");
        Ok(session)
    }

    #[instrument(skip(self, email, password), fields(email = %email), err)]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let body = json!({ "email": email, "password": password });

        let resp = self
            .exchange(Action::Login, None, Some(&body))
            .await
            .map_err(|_| IdentityError::Authentication(LOGIN_FAILED.to_string()))?;

        let session = self.establish(resp, IdentityError::Authentication, LOGIN_FAILED)?;
        tracing::info!(user_id = %session.user.id, role = %session.user.role, "logged in");
        Ok(session)
    }

    /// End the session.
    ///
    /// The local session is cleared before the backend is told, so the store
    /// ends up empty even if the revoke fails, hangs, or this future is dropped.
    /// The revoke goes out whenever a token is stored, even if the cached
    /// profile is unreadable.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let token = self.store.token();

        if let Err(err) = self.store.clear() {
            tracing::error!("failed to clear session on logout: {err:?}");
        }

        let Some(token) = token else {
            tracing::debug!("no session to revoke");
            return;
        };

        match self.exchange(Action::Logout, Some(&token), None).await {
            Ok(resp) if !resp.is_success() => {
                tracing::debug!(status = resp.status, "backend refused logout; ignored");
            }
            Ok(_) => {}
            Err(err) => tracing::debug!("logout revoke not delivered: {err}"),
        }
        tracing::info!("logged out");
    }

    /// Revalidate the cached session.
    ///
    /// An explicit refusal clears the store; an unreachable backend leaves it
    /// in place so a transient outage does not log the user out.
    #[instrument(skip(self))]
    pub async fn verify(&self) -> Verification {
        let Some(session) = self.store.load() else {
            return Verification::Invalid(InvalidReason::NoSession);
        };

        let resp = match self.exchange(Action::Verify, Some(&session.token), None).await {
            Ok(resp) => resp,
            Err(_) => return Verification::Invalid(InvalidReason::Unreachable),
        };

        if !resp.is_success() {
            tracing::info!(status = resp.status, "session rejected by backend");
            self.discard(&session.token);
            return Verification::Invalid(InvalidReason::Rejected);
        }

        let valid = resp.body.get("valid").and_then(Value::as_bool);
        let user = resp
            .body
            .get("user")
            .cloned()
            .map(serde_json::from_value::<User>)
            .transpose();

        match (valid, user) {
            (Some(false), _) => {
                tracing::info!("session reported invalid by backend");
                self.discard(&session.token);
                Verification::Invalid(InvalidReason::Rejected)
            }
            (Some(true), Ok(Some(user))) => {
                self.refresh(&session.token, &user);
                Verification::Valid(user)
            }
            (_, Err(err)) => {
                tracing::warn!("unreadable user in verify response: {err}");
                Verification::Invalid(InvalidReason::Malformed)
            }
            _ => {
                tracing::warn!("verify response missing `valid` or `user`");
                Verification::Invalid(InvalidReason::Malformed)
            }
        }
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        self.submit_credential_change(CredentialChange::new(old_password, new_password))
            .await
    }

    /// Send an already-validated credential change. The token is not rotated.
    #[instrument(skip(self, change), err)]
    pub async fn submit_credential_change(
        &self,
        change: CredentialChange,
    ) -> Result<(), IdentityError> {
        let Some(session) = self.store.load() else {
            return Err(IdentityError::not_authenticated());
        };

        let body = serde_json::to_value(&change)
            .map_err(|_| IdentityError::Credential(PASSWORD_CHANGE_FAILED.to_string()))?;

        let resp = self
            .exchange(Action::ChangePassword, Some(&session.token), Some(&body))
            .await
            .map_err(|_| IdentityError::Credential(PASSWORD_CHANGE_FAILED.to_string()))?;

        if resp.is_success() {
            tracing::info!(user_id = %session.user.id, "password changed");
            return Ok(());
        }

        if resp.is_unauthorized() {
            self.discard(&session.token);
            let msg = resp
                .error_message()
                .unwrap_or_else(|| AUTHENTICATION_REQUIRED.to_string());
            return Err(IdentityError::NotAuthenticated(msg));
        }

        let msg = resp
            .error_message()
            .unwrap_or_else(|| PASSWORD_CHANGE_FAILED.to_string());
        Err(IdentityError::Credential(msg))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Cached session (no network)
    // ─────────────────────────────────────────────────────────────────────

    /// Profile from the last successful login/verify. Never proof of access.
    pub fn cached_user(&self) -> Option<User> {
        self.store.load().map(|session| session.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.has_token()
    }

    pub fn is_admin(&self) -> bool {
        self.cached_user().is_some_and(|user| user.is_admin())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    async fn exchange(
        &self,
        action: Action,
        token: Option<&AuthToken>,
        body: Option<&Value>,
    ) -> Result<BackendResponse, TransportError> {
        match self.backend.send(action, token, body).await {
            Ok(resp) => {
                self.offline.set_online();
                tracing::debug!(%action, status = resp.status, "identity backend responded");
                Ok(resp)
            }
            Err(err) => {
                self.offline.set_offline();
                tracing::warn!(%action, "identity backend unreachable: {err}");
                Err(err)
            }
        }
    }

    fn establish(
        &self,
        resp: BackendResponse,
        kind: fn(String) -> IdentityError,
        generic: &str,
    ) -> Result<Session, IdentityError> {
        if !resp.is_success() {
            let msg = resp.error_message().unwrap_or_else(|| generic.to_string());
            return Err(kind(msg));
        }

        let payload: SessionPayload = serde_json::from_value(resp.body).map_err(|err| {
            tracing::error!("unreadable session payload: {err}");
            kind(generic.to_string())
        })?;
        if payload.token.as_str().is_empty() {
            tracing::error!("backend issued an empty token");
            return Err(kind(generic.to_string()));
        }

        self.store
            .save(&payload.token, &payload.user)
            .map_err(|err| {
                tracing::error!("failed to persist session: {err:?}");
                kind(generic.to_string())
            })?;

        Ok(Session::new(payload.token, payload.user))
    }

    /// Whether the store still holds the session issued for `token`.
    fn holds(&self, token: &AuthToken) -> bool {
        self.store
            .load()
            .is_some_and(|session| session.token == *token)
    }

    /// Clear the store unless a different session replaced it meanwhile.
    fn discard(&self, token: &AuthToken) {
        if !self.holds(token) {
            return;
        }
        if let Err(err) = self.store.clear() {
            tracing::error!("failed to clear rejected session: {err:?}");
        }
    }

    /// Replace the cached profile unless the session was cleared or replaced meanwhile.
    fn refresh(&self, token: &AuthToken, user: &User) {
        if !self.holds(token) {
            tracing::debug!("session changed during verify; profile not refreshed");
            return;
        }
        if let Err(err) = self.store.save(token, user) {
            tracing::warn!("failed to refresh cached profile: {err:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use storefront_auth::Role;
    use storefront_core::UserId;

    use super::*;
    use crate::session_store::MemorySessionStore;

    type Reply = Result<BackendResponse, TransportError>;

    #[derive(Debug, Clone)]
    struct Call {
        action: Action,
        token: Option<String>,
        body: Option<Value>,
    }

    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Reply>>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedBackend {
        fn replying(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        /// Fails the test on any call.
        fn silent() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IdentityBackend for ScriptedBackend {
        async fn send(
            &self,
            action: Action,
            token: Option<&AuthToken>,
            body: Option<&Value>,
        ) -> Result<BackendResponse, TransportError> {
            self.calls.lock().unwrap().push(Call {
                action,
                token: token.map(|t| t.as_str().to_string()),
                body: body.cloned(),
            });
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected backend call")
        }
    }

    fn ok(status: u16, body: Value) -> Reply {
        Ok(BackendResponse::new(status, body))
    }

    fn unreachable() -> Reply {
        Err(TransportError::Unreachable("connection refused".into()))
    }

    fn user(id: i64, role: Role) -> User {
        User::new(UserId::new(id), format!("u{id}@x.com"), role)
    }

    fn client_with(
        backend: Arc<ScriptedBackend>,
        session: Option<Session>,
    ) -> (IdentityClient, Arc<MemorySessionStore>) {
        let store = Arc::new(match session {
            Some(session) => MemorySessionStore::with_session(session),
            None => MemorySessionStore::new(),
        });
        let client = IdentityClient::new(backend, store.clone());
        (client, store)
    }

    fn prior_session() -> Session {
        Session::new(AuthToken::new("T0"), user(7, Role::User))
    }

    #[tokio::test]
    async fn login_persists_exactly_what_the_backend_issued() {
        let backend = ScriptedBackend::replying([ok(
            200,
            json!({
                "message": "Login successful",
                "token": "T1",
                "user": {"id": 1, "email": "a@x.com", "full_name": null, "phone": null, "role": "user"}
            }),
        )]);
        let (client, store) = client_with(backend.clone(), None);

        let session = client.login("a@x.com", "secret1").await.unwrap();

        let expected = Session::new(
            AuthToken::new("T1"),
            User::new(UserId::new(1), "a@x.com", Role::User),
        );
        assert_eq!(session, expected);
        assert_eq!(store.load(), Some(expected));

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].action, Action::Login);
        assert_eq!(calls[0].token, None);
        assert_eq!(
            calls[0].body,
            Some(json!({"email": "a@x.com", "password": "secret1"}))
        );
    }

    #[tokio::test]
    async fn failed_login_keeps_prior_session_and_shows_backend_message() {
        let backend = ScriptedBackend::replying([ok(401, json!({"error": "Invalid email or password"}))]);
        let (client, store) = client_with(backend, Some(prior_session()));

        let err = client.login("a@x.com", "wrong").await.unwrap_err();

        assert_eq!(
            err,
            IdentityError::Authentication("Invalid email or password".into())
        );
        assert_eq!(store.load(), Some(prior_session()));
    }

    #[tokio::test]
    async fn failed_login_without_message_uses_generic_one() {
        let backend = ScriptedBackend::replying([ok(500, Value::Null)]);
        let (client, _store) = client_with(backend, None);

        let err = client.login("a@x.com", "secret1").await.unwrap_err();
        assert_eq!(err, IdentityError::Authentication(LOGIN_FAILED.into()));
    }

    #[tokio::test]
    async fn login_transport_failure_is_an_authentication_error_and_marks_offline() {
        let backend = ScriptedBackend::replying([unreachable()]);
        let (client, store) = client_with(backend, Some(prior_session()));

        let err = client.login("a@x.com", "secret1").await.unwrap_err();

        assert_eq!(err, IdentityError::Authentication(LOGIN_FAILED.into()));
        assert_eq!(client.connectivity(), ConnectivityState::Offline);
        assert_eq!(store.load(), Some(prior_session()));
    }

    #[tokio::test]
    async fn login_success_without_token_is_rejected_and_store_untouched() {
        let backend = ScriptedBackend::replying([ok(200, json!({"message": "ok"}))]);
        let (client, store) = client_with(backend, None);

        let err = client.login("a@x.com", "secret1").await.unwrap_err();
        assert_eq!(err, IdentityError::Authentication(LOGIN_FAILED.into()));
        assert!(!store.has_token());
    }

    #[tokio::test]
    async fn register_sends_only_present_fields_and_stores_session() {
        let backend = ScriptedBackend::replying([ok(
            201,
            json!({
                "message": "User registered successfully",
                "token": "R1",
                "user": {"id": 3, "email": "new@x.com", "full_name": "Ann", "role": "user"}
            }),
        )]);
        let (client, store) = client_with(backend.clone(), None);

        let session = client
            .register("new@x.com", "secret1", Some("Ann"), None)
            .await
            .unwrap();

        assert_eq!(session.user.full_name.as_deref(), Some("Ann"));
        assert_eq!(store.load(), Some(session));
        assert_eq!(
            backend.calls()[0].body,
            Some(json!({"email": "new@x.com", "password": "secret1", "full_name": "Ann"}))
        );
    }

    #[tokio::test]
    async fn failed_register_reports_backend_message() {
        let backend = ScriptedBackend::replying([ok(400, json!({"error": "User already exists"}))]);
        let (client, store) = client_with(backend, None);

        let err = client
            .register("dup@x.com", "secret1", None, None)
            .await
            .unwrap_err();

        assert_eq!(err, IdentityError::Registration("User already exists".into()));
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn logout_clears_even_when_revoke_fails() {
        let backend = ScriptedBackend::replying([unreachable()]);
        let (client, store) = client_with(backend.clone(), Some(prior_session()));

        client.logout().await;

        assert!(store.load().is_none());
        assert!(!store.has_token());
        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].action, Action::Logout);
        assert_eq!(calls[0].token.as_deref(), Some("T0"));
    }

    #[tokio::test]
    async fn logout_revokes_token_whose_profile_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(crate::session_store::FileSessionStore::new(
            dir.path().join("session.json"),
        ));
        std::fs::write(store.path(), r#"{"token":"T9","user":"garbage"}"#).unwrap();
        assert!(store.load().is_none());

        let backend = ScriptedBackend::replying([ok(200, json!({"message": "Logged out"}))]);
        let client = IdentityClient::new(backend.clone(), store.clone());

        client.logout().await;

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].action, Action::Logout);
        assert_eq!(calls[0].token.as_deref(), Some("T9"));
        assert!(!store.has_token());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn logout_without_session_makes_no_call() {
        let backend = ScriptedBackend::silent();
        let (client, store) = client_with(backend.clone(), None);

        client.logout().await;

        assert!(backend.calls().is_empty());
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn verify_without_token_makes_no_call() {
        let backend = ScriptedBackend::silent();
        let (client, _store) = client_with(backend.clone(), None);

        let verification = client.verify().await;

        assert_eq!(verification, Verification::Invalid(InvalidReason::NoSession));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn verify_rejection_clears_store() {
        let backend = ScriptedBackend::replying([ok(401, json!({"error": "Invalid token"}))]);
        let (client, store) = client_with(backend, Some(prior_session()));

        let verification = client.verify().await;

        assert_eq!(verification, Verification::Invalid(InvalidReason::Rejected));
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn verify_network_failure_keeps_store() {
        let backend = ScriptedBackend::replying([unreachable()]);
        let (client, store) = client_with(backend, Some(prior_session()));

        let verification = client.verify().await;

        assert_eq!(verification, Verification::Invalid(InvalidReason::Unreachable));
        assert_eq!(store.load(), Some(prior_session()));
        assert!(client.offline_mode().is_offline());
    }

    #[tokio::test]
    async fn verify_success_replaces_cached_user() {
        let backend = ScriptedBackend::replying([ok(
            200,
            json!({"valid": true, "user": {"id": 7, "email": "u7@x.com", "role": "admin"}}),
        )]);
        let (client, store) = client_with(backend.clone(), Some(prior_session()));

        let verification = client.verify().await;

        let promoted = user(7, Role::Admin);
        assert_eq!(verification, Verification::Valid(promoted.clone()));
        assert_eq!(
            store.load(),
            Some(Session::new(AuthToken::new("T0"), promoted))
        );
        assert_eq!(backend.calls()[0].token.as_deref(), Some("T0"));
        assert_eq!(backend.calls()[0].action, Action::Verify);
    }

    #[tokio::test]
    async fn verify_reporting_invalid_clears_store() {
        let backend = ScriptedBackend::replying([ok(200, json!({"valid": false}))]);
        let (client, store) = client_with(backend, Some(prior_session()));

        assert_eq!(
            client.verify().await,
            Verification::Invalid(InvalidReason::Rejected)
        );
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn malformed_verify_response_keeps_store() {
        let backend = ScriptedBackend::replying([ok(200, json!({"valid": true}))]);
        let (client, store) = client_with(backend, Some(prior_session()));

        assert_eq!(
            client.verify().await,
            Verification::Invalid(InvalidReason::Malformed)
        );
        assert_eq!(store.load(), Some(prior_session()));
    }

    #[tokio::test]
    async fn change_password_without_login_makes_no_call() {
        let backend = ScriptedBackend::silent();
        let (client, _store) = client_with(backend.clone(), None);

        let err = client.change_password("old", "newpass").await.unwrap_err();

        assert_eq!(err, IdentityError::not_authenticated());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn change_password_rejection_carries_backend_message() {
        let backend =
            ScriptedBackend::replying([ok(400, json!({"error": "Invalid old password"}))]);
        let (client, store) = client_with(backend.clone(), Some(prior_session()));

        let err = client.change_password("bad", "newpass").await.unwrap_err();

        assert_eq!(err, IdentityError::Credential("Invalid old password".into()));
        assert_eq!(store.load(), Some(prior_session()));
        assert_eq!(
            backend.calls()[0].body,
            Some(json!({"old_password": "bad", "new_password": "newpass"}))
        );
    }

    #[tokio::test]
    async fn change_password_success_keeps_token() {
        let backend = ScriptedBackend::replying([ok(200, json!({"message": "Password changed"}))]);
        let (client, store) = client_with(backend, Some(prior_session()));

        client.change_password("old", "newpass").await.unwrap();
        assert_eq!(store.load(), Some(prior_session()));
    }

    #[tokio::test]
    async fn change_password_unauthorized_clears_session() {
        let backend = ScriptedBackend::replying([ok(401, json!({"error": "Invalid token"}))]);
        let (client, store) = client_with(backend, Some(prior_session()));

        let err = client.change_password("old", "newpass").await.unwrap_err();

        assert_eq!(err, IdentityError::NotAuthenticated("Invalid token".into()));
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn change_password_transport_failure_is_a_credential_error() {
        let backend = ScriptedBackend::replying([Err(TransportError::Timeout)]);
        let (client, store) = client_with(backend, Some(prior_session()));

        let err = client.change_password("old", "newpass").await.unwrap_err();

        assert_eq!(err, IdentityError::Credential(PASSWORD_CHANGE_FAILED.into()));
        assert_eq!(store.load(), Some(prior_session()));
    }

    #[test]
    fn cached_helpers_read_the_store_only() {
        let backend = ScriptedBackend::silent();
        let admin = Session::new(AuthToken::new("A"), user(1, Role::Admin));
        let (client, _store) = client_with(backend.clone(), Some(admin.clone()));

        assert!(client.is_authenticated());
        assert!(client.is_admin());
        assert_eq!(client.cached_user(), Some(admin.user));
        assert!(backend.calls().is_empty());

        let (client, _store) = client_with(backend, None);
        assert!(!client.is_authenticated());
        assert!(!client.is_admin());
        assert_eq!(client.cached_user(), None);
    }
}
