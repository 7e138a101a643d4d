//! RotationRegistry: the refresh-token chain
//!
//! Each refresh token minted by a `/auth/refresh` call references the token
//! it replaced. `invalidate` walks that chain backwards, revoking every
//! ancestor, so a stolen-then-replayed token can't fall back to an older
//! link once the chain has moved on.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::store::Store;
use crate::tokens::REFRESH_LIFETIME;

const SNAPSHOT_PATH: &str = ".token-rotation-registry";

#[derive(Debug, Clone)]
pub struct RotationNode {
    pub subject: String,
    pub created_at: DateTime<Utc>,
    pub previous: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNode {
    username: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "previousToken")]
    previous_token: Option<String>,
}

pub struct RotationRegistry {
    store: Arc<Store>,
    map: Mutex<HashMap<String, RotationNode>>,
}

impl RotationRegistry {
    /// Load the snapshot at `.token-rotation-registry`, if present.
    pub async fn boot(store: Arc<Store>) -> Result<Self> {
        let stored: HashMap<String, StoredNode> = store.load_document(SNAPSHOT_PATH, HashMap::new()).await?;
        let map = stored
            .into_iter()
            .map(|(token, node)| {
                (
                    token,
                    RotationNode {
                        subject: node.username,
                        created_at: node.created_at,
                        previous: node.previous_token,
                    },
                )
            })
            .collect();
        Ok(Self {
            store,
            map: Mutex::new(map),
        })
    }

    /// Unconditional insert of a new chain link.
    pub async fn register(&self, token: &str, subject: &str, previous: Option<String>) -> Result<()> {
        {
            let mut map = self.map.lock().await;
            map.insert(
                token.to_string(),
                RotationNode {
                    subject: subject.to_string(),
                    created_at: Utc::now(),
                    previous,
                },
            );
        }
        self.save_snapshot().await
    }

    /// True iff `token` exists, belongs to `subject`, and hasn't aged out of
    /// the 30-day horizon. Expired entries are swept on observation.
    pub async fn validate(&self, token: &str, subject: &str) -> bool {
        let mut map = self.map.lock().await;
        match map.get(token) {
            Some(node) if node.subject == subject => {
                if Utc::now() - node.created_at > REFRESH_LIFETIME {
                    map.remove(token);
                    false
                } else {
                    true
                }
            }
            _ => false,
        }
    }

    /// Delete `token`, then walk `previous` links until one is already absent.
    pub async fn invalidate(&self, token: &str) -> Result<()> {
        self.invalidate_chain(token).await.map(|_| ())
    }

    /// Same as [`invalidate`](Self::invalidate), returning every token string
    /// removed from the chain so a caller can also evict them from the
    /// `TokenStore`'s mirror.
    pub async fn invalidate_chain(&self, token: &str) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        {
            let mut map = self.map.lock().await;
            let mut current = Some(token.to_string());
            while let Some(t) = current {
                match map.remove(&t) {
                    Some(node) => {
                        current = node.previous;
                        removed.push(t);
                    }
                    None => break,
                }
            }
        }
        self.save_snapshot().await?;
        Ok(removed)
    }

    /// Remove every node belonging to `subject` (signout, delete-account).
    pub async fn clear_user_tokens(&self, subject: &str) -> Result<()> {
        {
            let mut map = self.map.lock().await;
            map.retain(|_, node| node.subject != subject);
        }
        self.save_snapshot().await
    }

    /// Sweep expired nodes without touching valid ones.
    pub async fn cleanup(&self) -> Result<()> {
        let now = Utc::now();
        {
            let mut map = self.map.lock().await;
            map.retain(|_, node| now - node.created_at <= REFRESH_LIFETIME);
        }
        self.save_snapshot().await
    }

    async fn save_snapshot(&self) -> Result<()> {
        let snapshot: HashMap<String, StoredNode> = {
            let map = self.map.lock().await;
            map.iter()
                .map(|(token, node)| {
                    (
                        token.clone(),
                        StoredNode {
                            username: node.subject.clone(),
                            created_at: node.created_at,
                            previous_token: node.previous.clone(),
                        },
                    )
                })
                .collect()
        };
        self.store.save_document(SNAPSHOT_PATH, &snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry() -> (tempfile::TempDir, Arc<Store>, RotationRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path().to_path_buf()));
        let registry = RotationRegistry::boot(store.clone()).await.unwrap();
        (dir, store, registry)
    }

    #[tokio::test]
    async fn validate_true_until_invalidated() {
        let (_dir, _store, registry) = registry().await;
        registry.register("rt1", "alice", None).await.unwrap();
        assert!(registry.validate("rt1", "alice").await);

        registry.invalidate("rt1").await.unwrap();
        assert!(!registry.validate("rt1", "alice").await);
    }

    #[tokio::test]
    async fn invalidate_cascades_whole_chain() {
        let (_dir, _store, registry) = registry().await;
        registry.register("rt1", "alice", None).await.unwrap();
        registry.register("rt2", "alice", Some("rt1".into())).await.unwrap();
        registry.register("rt3", "alice", Some("rt2".into())).await.unwrap();

        registry.invalidate("rt3").await.unwrap();

        assert!(!registry.validate("rt1", "alice").await);
        assert!(!registry.validate("rt2", "alice").await);
        assert!(!registry.validate("rt3", "alice").await);
    }

    #[tokio::test]
    async fn invalidate_twice_is_noop() {
        let (_dir, _store, registry) = registry().await;
        registry.register("rt1", "alice", None).await.unwrap();
        registry.invalidate("rt1").await.unwrap();
        registry.invalidate("rt1").await.unwrap();
    }

    #[tokio::test]
    async fn clear_user_tokens_removes_all_nodes() {
        let (_dir, _store, registry) = registry().await;
        registry.register("rt1", "alice", None).await.unwrap();
        registry.register("rt2", "bob", None).await.unwrap();

        registry.clear_user_tokens("alice").await.unwrap();
        assert!(!registry.validate("rt1", "alice").await);
        assert!(registry.validate("rt2", "bob").await);
    }

    #[tokio::test]
    async fn snapshot_roundtrips_across_boot() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path().to_path_buf()));
        let registry = RotationRegistry::boot(store.clone()).await.unwrap();
        registry.register("rt1", "alice", Some("rt0".into())).await.unwrap();

        let rebooted = RotationRegistry::boot(store).await.unwrap();
        assert!(rebooted.validate("rt1", "alice").await);
    }
}
