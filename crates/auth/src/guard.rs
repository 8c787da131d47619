//! Per-mount guard lifecycle.
//!
//! ```text
//! Pending ──Allow──────────────▶ Allowed ──401──▶ Pending
//!    ├────RedirectToLogin─────▶ RedirectingToLogin      (terminal)
//!    └────RedirectToFallback──▶ RedirectingToFallback   (terminal)
//! ```

use thiserror::Error;

use crate::{Decision, User};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Pending,
    Allowed(User),
    RedirectingToLogin,
    RedirectingToFallback,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardTransitionError {
    #[error("guard already resolved to '{0}'")]
    AlreadyResolved(&'static str),
}

impl GuardState {
    pub fn label(&self) -> &'static str {
        match self {
            GuardState::Pending => "pending",
            GuardState::Allowed(_) => "allowed",
            GuardState::RedirectingToLogin => "redirecting_login",
            GuardState::RedirectingToFallback => "redirecting_fallback",
        }
    }

    /// Redirects end the mount; nothing moves out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GuardState::RedirectingToLogin | GuardState::RedirectingToFallback
        )
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            GuardState::Allowed(user) => Some(user),
            _ => None,
        }
    }

    /// Apply a guard decision. Only a pending guard can be resolved; on error
    /// the state is left untouched.
    pub fn resolve(&mut self, decision: Decision) -> Result<(), GuardTransitionError> {
        if !matches!(self, GuardState::Pending) {
            return Err(GuardTransitionError::AlreadyResolved(self.label()));
        }

        *self = match decision {
            Decision::Allow(user) => GuardState::Allowed(user),
            Decision::RedirectToLogin => GuardState::RedirectingToLogin,
            Decision::RedirectToFallback => GuardState::RedirectingToFallback,
        };
        Ok(())
    }

    /// An authenticated call from an allowed view was answered with 401.
    ///
    /// The view goes back to `Pending` so the same decision runs again.
    /// Returns `false` (and changes nothing) for any other state.
    pub fn revoke(&mut self) -> bool {
        if matches!(self, GuardState::Allowed(_)) {
            *self = GuardState::Pending;
            true
        } else {
            false
        }
    }
}
