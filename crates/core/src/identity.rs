//! Caller identity carried through every write.
//!
//! The HTTP layer resolves the identity once per request and hands it to services by value.
//! Nothing in core reads cookies or headers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Username recorded when a request carries no valid session.
pub const UNKNOWN_CALLER: &str = "Unknown";

/// Who is making a request, as far as the shared-password login can tell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    username: String,
    authenticated: bool,
}

impl CallerIdentity {
    /// Identity for a caller that logged in as `username`.
    ///
    /// Blank usernames collapse to the unknown sentinel. Line breaks are flattened to spaces
    /// since the name ends up in commit trailers.
    pub fn new(username: impl AsRef<str>) -> Self {
        let flattened = username.as_ref().replace(['\n', '\r'], " ");
        let trimmed = flattened.trim();
        if trimmed.is_empty() {
            return Self::unknown();
        }
        Self {
            username: trimmed.to_string(),
            authenticated: true,
        }
    }

    pub fn unknown() -> Self {
        Self {
            username: UNKNOWN_CALLER.to_string(),
            authenticated: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

impl Default for CallerIdentity {
    fn default() -> Self {
        Self::unknown()
    }
}
