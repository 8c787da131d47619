//! Errors surfaced by the identity client.

use thiserror::Error;

pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const LOGIN_FAILED: &str = "Login failed";
pub const AUTHENTICATION_REQUIRED: &str = "Authentication required";
pub const PASSWORD_CHANGE_FAILED: &str = "Password change failed";

/// Failure of an identity operation.
///
/// Each variant carries a message fit to show the user: the backend's own
/// `error` text when it sent one, otherwise one of the generic messages above.
/// Transport failures are folded into the kind of the operation that hit them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("{0}")]
    Registration(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    NotAuthenticated(String),

    #[error("{0}")]
    Credential(String),
}

impl IdentityError {
    pub fn message(&self) -> &str {
        match self {
            IdentityError::Registration(msg)
            | IdentityError::Authentication(msg)
            | IdentityError::NotAuthenticated(msg)
            | IdentityError::Credential(msg) => msg,
        }
    }

    /// Stable name of the error kind, for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityError::Registration(_) => "registration_error",
            IdentityError::Authentication(_) => "authentication_error",
            IdentityError::NotAuthenticated(_) => "not_authenticated",
            IdentityError::Credential(_) => "credential_error",
        }
    }

    pub fn not_authenticated() -> Self {
        IdentityError::NotAuthenticated(AUTHENTICATION_REQUIRED.to_string())
    }
}
