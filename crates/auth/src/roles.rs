use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Authorization tag carried by every user.
///
/// The set is closed and server-assigned. Anything the backend sends that is
/// not exactly `"admin"` decodes as [`Role::User`], so an unexpected value can
/// never widen access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Lenient decoding used for backend payloads.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Whatever shape the backend sends, the role never fails the
        // surrounding record; non-strings are simply not `admin`.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WireRole {
            Text(String),
            Other(IgnoredAny),
        }

        Ok(match WireRole::deserialize(deserializer)? {
            WireRole::Text(raw) => Role::from_wire(&raw),
            WireRole::Other(_) => Role::User,
        })
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
