//! Shared application state handed to every handler

use std::collections::BTreeSet;
use std::sync::Arc;

use access_control::{AccessEvaluator, RateLimiter};
use auth_router::Router;
use auth_store::{Error, KeyedLocks, RotationRegistry, Store, TokenStore, UserDirectory, User};
use tracing::info;

use crate::config::Config;
use crate::route::RouteId;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub directory: Arc<UserDirectory>,
    pub tokens: Arc<TokenStore>,
    pub rotation: Arc<RotationRegistry>,
    pub evaluator: Arc<AccessEvaluator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub locks: Arc<KeyedLocks>,
    pub router: Arc<Router<RouteId>>,
    pub config: Arc<Config>,
    pub server_id: String,
}

/// On first start with an empty user directory, create the `root` account
/// (`password: root`, role `admin`, already verified) and mint it a pair so
/// an operator has something to sign in with immediately.
pub async fn bootstrap_root(state: &AppState) -> auth_store::Result<()> {
    match state.directory.get_user("root").await {
        Ok(_) => return Ok(()),
        Err(Error::NotFound) => {}
        Err(e) => return Err(e),
    }
    if !state.directory.list_users().await?.is_empty() {
        return Ok(());
    }

    let now = chrono::Utc::now();
    let mut roles = BTreeSet::new();
    roles.insert("admin".to_string());
    let root = User {
        name: "root".to_string(),
        email: "root@localhost".to_string(),
        password_hash: auth_store::short_digest("root"),
        verified: true,
        verification_code: None,
        reset_code: None,
        roles,
        created_at: now,
        updated_at: now,
    };
    state.directory.save_user(&root).await?;
    let pair = state.tokens.mint_pair("root").await?;
    state.rotation.register(&pair.refresh_token, "root", None).await?;
    info!("bootstrapped root account");
    Ok(())
}
