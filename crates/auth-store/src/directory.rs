//! UserDirectory: sharded per-user documents layered over `Store`
//!
//! A user named `alice` lives under `users/al/ic/alice/`. `info.json` holds
//! the `User` record; `tokens.json` and `access.txt` are owned by
//! `TokenStore` and `AccessEvaluator` respectively, but the directory knows
//! the shared shard path both need.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::store::Store;
use crate::user::{User, shard_dir, validate_username};

pub struct UserDirectory {
    store: Arc<Store>,
}

impl UserDirectory {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn info_path(name: &str) -> PathBuf {
        PathBuf::from(shard_dir(name)).join("info.json")
    }

    pub fn tokens_path(name: &str) -> PathBuf {
        PathBuf::from(shard_dir(name)).join("tokens.json")
    }

    pub fn access_path(name: &str) -> PathBuf {
        PathBuf::from(shard_dir(name)).join("access.txt")
    }

    /// Load `info.json`. Absent file is reported as `Error::NotFound`.
    pub async fn get_user(&self, name: &str) -> Result<User> {
        let bytes = self.store.read_raw(Self::info_path(name)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn user_exists(&self, name: &str) -> bool {
        self.get_user(name).await.is_ok()
    }

    /// Validate the name pattern, then persist `info.json`.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        validate_username(&user.name)?;
        self.store.save_document(Self::info_path(&user.name), user).await
    }

    /// Remove `info.json` and `tokens.json`. Rotation-chain cleanup is the
    /// caller's responsibility (it spans a different namespace entirely).
    pub async fn delete_user(&self, name: &str) -> Result<()> {
        self.store.drop_document(Self::info_path(name)).await?;
        self.store.drop_document(Self::tokens_path(name)).await?;
        self.store.drop_document(Self::access_path(name)).await?;
        Ok(())
    }

    /// All usernames found by scanning `info.json` files under the user tree,
    /// sorted ascending.
    pub async fn list_users(&self) -> Result<Vec<String>> {
        let entries = self.store.walk("users").await?;
        let mut names: Vec<String> = entries
            .into_iter()
            .filter(|(path, is_file)| *is_file && path.file_name().map(|n| n == "info.json").unwrap_or(false))
            .filter_map(|(path, _)| {
                path.parent()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// Per-user access rule text, or an empty string when `access.txt` is absent.
    pub async fn access_rules(&self, name: &str) -> Result<String> {
        self.store.load_text(Self::access_path(name), String::new()).await
    }
}
