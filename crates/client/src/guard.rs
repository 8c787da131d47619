//! Access guard shared by every protected view.

use std::sync::Arc;

use storefront_auth::{Decision, Role, decide};

use crate::identity::IdentityClient;

/// Decides, per mount, whether a protected view may render.
///
/// Always revalidates with the backend first; the cached profile is never
/// enough to grant access. Never fails: anything it cannot confirm ends in
/// [`Decision::RedirectToLogin`].
#[derive(Clone)]
pub struct AccessGuard {
    identity: Arc<IdentityClient>,
}

impl AccessGuard {
    pub fn new(identity: Arc<IdentityClient>) -> Self {
        Self { identity }
    }

    pub async fn decide(&self, required: Option<Role>) -> Decision {
        let verification = self.identity.verify().await;
        let decision = decide(verification, required);

        tracing::info!(
            required = required.map(|r| r.as_str()).unwrap_or("any"),
            decision = decision.label(),
            user_id = decision.user().map(|u| u.id.get()),
            "access decided"
        );
        decision
    }
}
