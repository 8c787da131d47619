//! Access decision for protected views.

use crate::{Role, User, Verification};

/// What a protected view should do after its guard pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Render the view for this identity.
    Allow(User),
    /// No valid session (or its validity could not be confirmed).
    RedirectToLogin,
    /// Valid session whose role does not satisfy the view.
    RedirectToFallback,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Decision::Allow(user) => Some(user),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allow(_) => "allow",
            Decision::RedirectToLogin => "redirect_login",
            Decision::RedirectToFallback => "redirect_fallback",
        }
    }
}

/// Decide access from a fresh verification.
///
/// - No IO
/// - No panics
/// - Anything short of a confirmed user is `RedirectToLogin` (fail closed)
pub fn decide(verification: Verification, required: Option<Role>) -> Decision {
    let Some(user) = verification.into_user() else {
        return Decision::RedirectToLogin;
    };

    match required {
        Some(role) if user.role != role => {
            tracing::debug!(
                user_id = %user.id,
                role = %user.role,
                required = %role,
                "role does not satisfy view requirement"
            );
            Decision::RedirectToFallback
        }
        _ => Decision::Allow(user),
    }
}
