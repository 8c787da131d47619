//! Credential change request and the checks run before it is sent.

use serde::Serialize;
use thiserror::Error;

/// Shortest new password the panel accepts before asking the backend.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Ephemeral `{old_password, new_password}` pair.
///
/// Never persisted; dropped as soon as the round trip finishes. `Debug` is
/// redacted.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CredentialChange {
    old_password: String,
    new_password: String,
}

impl CredentialChange {
    pub fn new(old_password: impl Into<String>, new_password: impl Into<String>) -> Self {
        Self {
            old_password: old_password.into(),
            new_password: new_password.into(),
        }
    }
}

impl core::fmt::Debug for CredentialChange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialChange")
            .field("old_password", &"<redacted>")
            .field("new_password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordChangeError {
    #[error("current password is required")]
    MissingCurrent,

    #[error("new passwords do not match")]
    Mismatch,

    #[error("new password must be at least {0} characters")]
    TooShort(usize),
}

/// The three fields of the profile page's password form.
#[derive(Debug, Clone, Copy)]
pub struct PasswordChangeForm<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
    pub confirmation: &'a str,
}

impl<'a> PasswordChangeForm<'a> {
    pub fn new(old_password: &'a str, new_password: &'a str, confirmation: &'a str) -> Self {
        Self {
            old_password,
            new_password,
            confirmation,
        }
    }

    /// Check the form locally and build the request to send.
    pub fn validate(self) -> Result<CredentialChange, PasswordChangeError> {
        if self.old_password.is_empty() {
            return Err(PasswordChangeError::MissingCurrent);
        }
        if self.new_password != self.confirmation {
            return Err(PasswordChangeError::Mismatch);
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PasswordChangeError::TooShort(MIN_PASSWORD_LEN));
        }

        Ok(CredentialChange::new(self.old_password, self.new_password))
    }
}
