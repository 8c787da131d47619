//! Protected panel pages and their per-mount controllers.

use core::str::FromStr;

use serde_json::Value;
use storefront_auth::{GuardState, Role};
use storefront_core::DomainError;

use crate::api::{ApiError, AuthenticatedApi};
use crate::guard::AccessGuard;

pub const LOGIN_ROUTE: &str = "/login";
pub const FALLBACK_ROUTE: &str = "/dashboard";

/// Pages of the panel that require a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectedView {
    Dashboard,
    Profile,
    Admin,
    AdminContent,
    AdminUsers,
    AdminProducts,
    AdminOrders,
    AdminSettings,
}

impl ProtectedView {
    pub const ALL: [ProtectedView; 8] = [
        ProtectedView::Dashboard,
        ProtectedView::Profile,
        ProtectedView::Admin,
        ProtectedView::AdminContent,
        ProtectedView::AdminUsers,
        ProtectedView::AdminProducts,
        ProtectedView::AdminOrders,
        ProtectedView::AdminSettings,
    ];

    pub fn route(&self) -> &'static str {
        match self {
            ProtectedView::Dashboard => "/dashboard",
            ProtectedView::Profile => "/profile",
            ProtectedView::Admin => "/admin",
            ProtectedView::AdminContent => "/admin/content",
            ProtectedView::AdminUsers => "/admin/users",
            ProtectedView::AdminProducts => "/admin/products",
            ProtectedView::AdminOrders => "/admin/orders",
            ProtectedView::AdminSettings => "/admin/settings",
        }
    }

    pub fn required_role(&self) -> Option<Role> {
        match self {
            ProtectedView::Dashboard | ProtectedView::Profile => None,
            _ => Some(Role::Admin),
        }
    }

    /// Where an authenticated user without the required role is sent.
    pub fn fallback_route(&self) -> &'static str {
        FALLBACK_ROUTE
    }

    /// Backend action that loads the page's data once access is granted.
    pub fn data_action(&self) -> Option<&'static str> {
        match self {
            ProtectedView::Dashboard | ProtectedView::Profile => None,
            ProtectedView::Admin => Some("stats"),
            ProtectedView::AdminContent | ProtectedView::AdminSettings => Some("content"),
            ProtectedView::AdminUsers => Some("users"),
            ProtectedView::AdminProducts => Some("products"),
            ProtectedView::AdminOrders => Some("get-orders"),
        }
    }
}

impl core::fmt::Display for ProtectedView {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.route())
    }
}

impl FromStr for ProtectedView {
    type Err = DomainError;

    /// Accepts a route (`/admin/users`) or its bare form (`admin/users`, `admin-users`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('/').replace('-', "/");
        ProtectedView::ALL
            .into_iter()
            .find(|view| view.route().trim_start_matches('/') == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown view: {s}")))
    }
}

/// What the page should show right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Guard still pending; show a loading state.
    Wait,
    Render,
    Redirect(&'static str),
}

/// One mount of a protected page.
pub struct ViewController {
    view: ProtectedView,
    guard: AccessGuard,
    state: GuardState,
}

impl ViewController {
    pub fn new(view: ProtectedView, guard: AccessGuard) -> Self {
        Self {
            view,
            guard,
            state: GuardState::Pending,
        }
    }

    pub fn view(&self) -> ProtectedView {
        self.view
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn navigation(&self) -> Navigation {
        match self.state {
            GuardState::Pending => Navigation::Wait,
            GuardState::Allowed(_) => Navigation::Render,
            GuardState::RedirectingToLogin => Navigation::Redirect(LOGIN_ROUTE),
            GuardState::RedirectingToFallback => Navigation::Redirect(self.view.fallback_route()),
        }
    }

    /// Run the guard if this mount has not been decided yet.
    pub async fn mount(&mut self) -> Navigation {
        if self.state == GuardState::Pending {
            let decision = self.guard.decide(self.view.required_role()).await;
            if let Err(err) = self.state.resolve(decision) {
                tracing::debug!(view = %self.view, "{err}");
            }
        }
        self.navigation()
    }

    /// React to a failed authenticated call made by this page.
    ///
    /// A 401 drops the grant and re-runs the decision; anything else leaves
    /// the page where it is.
    pub async fn handle_api_error(&mut self, err: &ApiError) -> Navigation {
        if err.is_unauthorized() && self.state.revoke() {
            tracing::info!(view = %self.view, "session lost; re-checking access");
            return self.mount().await;
        }
        self.navigation()
    }

    /// Load the page's data once rendering is allowed.
    ///
    /// Returns `Ok(None)` for pages without a data action or when the mount
    /// is not (or no longer) allowed.
    pub async fn load(&mut self, api: &AuthenticatedApi) -> Result<Option<Value>, ApiError> {
        let Some(action) = self.view.data_action() else {
            return Ok(None);
        };
        if !matches!(self.state, GuardState::Allowed(_)) {
            return Ok(None);
        }

        match api.get(action, &[]).await {
            Ok(data) => Ok(Some(data)),
            Err(err) => {
                self.handle_api_error(&err).await;
                Err(err)
            }
        }
    }

    pub fn unmount(&mut self) {
        self.state = GuardState::Pending;
    }
}
