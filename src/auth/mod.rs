pub mod tokens;

pub use tokens::{Claims, TokenPair, TokenSigner};

use serde::{Deserialize, Serialize};

/// Coarse authorization level attached to a user record.
///
/// Variants are ordered from least to most privileged so a handler can state
/// its minimum capability as `ctx.require(Role::Admin)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    User,
    Staff,
    Admin,
}

impl Role {
    /// Parse a stored role string. Unknown values are rejected so a typo in
    /// an admin PATCH cannot silently grant or revoke privileges.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Lenient variant for values already in the database.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::User)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::User => "user",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }
}
