//! Client-held proof of identity.

use serde::{Deserialize, Serialize};

use crate::User;

/// Opaque bearer credential issued by the identity backend.
///
/// The client never inspects it; it is only replayed on authenticated calls.
/// `Debug` is redacted so tokens do not leak into logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization`-style header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl core::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// A logged-in identity: the token and the profile it was issued for.
///
/// The two halves only ever travel together; there is no way to build a
/// session with one of them missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: AuthToken,
    pub user: User,
}

impl Session {
    pub fn new(token: AuthToken, user: User) -> Self {
        Self { token, user }
    }
}

/// Why a verification did not produce a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Nothing cached locally; no request was made.
    NoSession,
    /// The backend answered and refused the token.
    Rejected,
    /// The backend could not be reached; the token's validity is unknown.
    Unreachable,
    /// The backend answered with a success status but an unusable payload.
    Malformed,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::NoSession => "no_session",
            InvalidReason::Rejected => "rejected",
            InvalidReason::Unreachable => "unreachable",
            InvalidReason::Malformed => "malformed",
        }
    }
}

/// Result of revalidating the cached session against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid(User),
    Invalid(InvalidReason),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Verification::Valid(user) => Some(user),
            Verification::Invalid(_) => None,
        }
    }

    pub fn into_user(self) -> Option<User> {
        match self {
            Verification::Valid(user) => Some(user),
            Verification::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use storefront_core::UserId;

    #[test]
    fn token_debug_is_redacted() {
        let token = AuthToken::new("super-secret");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("super-secret"));
        assert_eq!(token.bearer(), "Bearer super-secret");
    }

    #[test]
    fn session_serializes_token_as_plain_string() {
        let session = Session::new(
            AuthToken::new("T1"),
            User::new(UserId::new(1), "a@x.com", Role::User),
        );
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["token"], "T1");
        assert_eq!(value["user"]["email"], "a@x.com");
    }

    #[test]
    fn verification_accessors() {
        let user = User::new(UserId::new(1), "a@x.com", Role::User);
        let ok = Verification::Valid(user.clone());
        assert!(ok.is_valid());
        assert_eq!(ok.user(), Some(&user));

        let no = Verification::Invalid(InvalidReason::Rejected);
        assert!(!no.is_valid());
        assert_eq!(no.into_user(), None);
    }
}
