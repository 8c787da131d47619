//! Read-only projection of the server-owned user record.

use serde::{Deserialize, Serialize};
use storefront_core::UserId;

use crate::Role;

/// Cached user profile.
///
/// The client never edits these fields; it only replaces the whole record with
/// whatever the identity backend last returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn new(id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            full_name: None,
            phone: None,
            role,
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Name to greet the user with: the full name when set, otherwise the email.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }
}
