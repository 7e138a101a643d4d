//! The User entity and username validation

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A user record as persisted in `info.json` — token material lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_code: Option<String>,
    pub roles: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles.contains("admin")
    }

    /// Whether this user's full record (minus secrets) is publicly visible.
    /// There is no dedicated `isPublic` field in the data model; this reads
    /// the `public` role, matching how `roles` already gates `admin`.
    pub fn is_public(&self) -> bool {
        self.roles.contains("public")
    }
}

/// Validate the username pattern: 3-32 chars of `[A-Za-z0-9_-]`.
pub fn validate_username(name: &str) -> Result<()> {
    let len_ok = (3..=32).contains(&name.len());
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if len_ok && chars_ok {
        Ok(())
    } else {
        Err(Error::InvalidUsername(name.to_string()))
    }
}

/// Sharded path: `users/<first2>/<next2>/<name>/`.
pub fn shard_dir(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let first2: String = chars.iter().take(2).collect();
    let next2: String = chars.iter().skip(2).take(2).collect();
    format!("users/{first2}/{next2}/{name}")
}
