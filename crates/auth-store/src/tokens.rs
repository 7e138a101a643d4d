//! TokenStore: in-memory token map with an on-disk mirror per user
//!
//! Boots by walking the user tree and loading every `tokens.json`. Lookup is
//! O(1) against the in-memory map; the disk mirror exists so a restart can
//! rehydrate it, and is rewritten whenever a user's token set changes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::directory::UserDirectory;
use crate::error::Result;
use crate::hash::random_token;
use crate::store::Store;
use crate::user::User;

/// Fixed access-token lifetime: 1 hour.
pub const ACCESS_LIFETIME: ChronoDuration = ChronoDuration::hours(1);
/// Fixed refresh-token lifetime: 30 days.
pub const REFRESH_LIFETIME: ChronoDuration = ChronoDuration::days(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub subject: String,
    pub expiry: DateTime<Utc>,
    pub kind: TokenKind,
}

/// On-disk shape of a single entry in a user's `tokens.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    time: DateTime<Utc>,
    #[serde(rename = "isRefresh")]
    is_refresh: bool,
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Why `auth()` failed to resolve a token to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    TokenUnknown,
    TokenExpired,
    SubjectMissing,
}

pub struct TokenStore {
    store: Arc<Store>,
    map: Mutex<HashMap<String, TokenRecord>>,
}

impl TokenStore {
    /// Walk the user tree and load every `tokens.json` into memory.
    pub async fn boot(store: Arc<Store>) -> Result<Self> {
        let mut map = HashMap::new();
        for (path, is_file) in store.walk("users").await? {
            if !is_file || path.file_name().map(|n| n != "tokens.json").unwrap_or(true) {
                continue;
            }
            let Some(subject) = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };

            let stored: HashMap<String, StoredToken> = store.load_document(&path, HashMap::new()).await?;
            for (token, entry) in stored {
                let kind = if entry.is_refresh {
                    TokenKind::Refresh
                } else {
                    TokenKind::Access
                };
                let lifetime = if entry.is_refresh { REFRESH_LIFETIME } else { ACCESS_LIFETIME };
                map.insert(
                    token,
                    TokenRecord {
                        subject: subject.clone(),
                        expiry: entry.time + lifetime,
                        kind,
                    },
                );
            }
        }
        debug!(tokens = map.len(), "token store booted");
        Ok(Self {
            store,
            map: Mutex::new(map),
        })
    }

    /// Mint a new access/refresh pair for `subject` and persist both to its `tokens.json`.
    pub async fn mint_pair(&self, subject: &str) -> Result<TokenPair> {
        let now = Utc::now();
        let access_token = random_token();
        let refresh_token = random_token();
        let access_expires_at = now + ACCESS_LIFETIME;
        let refresh_expires_at = now + REFRESH_LIFETIME;

        {
            let mut map = self.map.lock().await;
            map.insert(
                access_token.clone(),
                TokenRecord { subject: subject.to_string(), expiry: access_expires_at, kind: TokenKind::Access },
            );
            map.insert(
                refresh_token.clone(),
                TokenRecord { subject: subject.to_string(), expiry: refresh_expires_at, kind: TokenKind::Refresh },
            );
        }
        self.persist_user(subject).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Resolve a bearer token to its user, self-healing expired entries.
    pub async fn auth(&self, token: &str, directory: &UserDirectory) -> std::result::Result<User, AuthFailure> {
        let record = {
            let map = self.map.lock().await;
            map.get(token).cloned()
        };
        let Some(record) = record else {
            return Err(AuthFailure::TokenUnknown);
        };

        if Utc::now() > record.expiry {
            self.remove_token(token, &record.subject).await.ok();
            return Err(AuthFailure::TokenExpired);
        }

        match directory.get_user(&record.subject).await {
            Ok(user) => Ok(user),
            Err(_) => {
                warn!(subject = %record.subject, "token authenticated but subject is missing");
                Err(AuthFailure::SubjectMissing)
            }
        }
    }

    /// Remove a single token from memory and rewrite its owner's `tokens.json`.
    pub async fn remove_token(&self, token: &str, subject: &str) -> Result<()> {
        {
            let mut map = self.map.lock().await;
            map.remove(token);
        }
        self.persist_user(subject).await
    }

    /// Remove every token belonging to `subject` (signout, delete-account, reset-clears-tokens).
    pub async fn clear_user_tokens(&self, subject: &str) -> Result<()> {
        {
            let mut map = self.map.lock().await;
            map.retain(|_, record| record.subject != subject);
        }
        self.persist_user(subject).await
    }

    /// Rewrite `subject`'s `tokens.json` from the current in-memory state.
    async fn persist_user(&self, subject: &str) -> Result<()> {
        let entries: HashMap<String, StoredToken> = {
            let map = self.map.lock().await;
            map.iter()
                .filter(|(_, record)| record.subject == subject)
                .map(|(token, record)| {
                    let lifetime = match record.kind {
                        TokenKind::Refresh => REFRESH_LIFETIME,
                        TokenKind::Access => ACCESS_LIFETIME,
                    };
                    (
                        token.clone(),
                        StoredToken {
                            time: record.expiry - lifetime,
                            is_refresh: matches!(record.kind, TokenKind::Refresh),
                        },
                    )
                })
                .collect()
        };
        self.store
            .save_document(UserDirectory::tokens_path(subject), &entries)
            .await
    }
}
