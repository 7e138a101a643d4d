//! Persistence and credential layer for the authorization server
//!
//! Layering, leaves first: `Store` owns the on-disk byte layout; `hash`
//! provides digests independent of everything else; `UserDirectory`,
//! `TokenStore`, and `RotationRegistry` each own a slice of the namespace
//! and present it to the service layer.

pub mod directory;
pub mod error;
pub mod hash;
pub mod lock;
pub mod rotation;
pub mod store;
pub mod tokens;
pub mod user;

pub use directory::UserDirectory;
pub use error::{Error, Result};
pub use hash::{random_token, short_digest, verification_code};
pub use lock::KeyedLocks;
pub use rotation::{RotationNode, RotationRegistry};
pub use store::Store;
pub use tokens::{AuthFailure, TokenKind, TokenPair, TokenRecord, TokenStore, ACCESS_LIFETIME, REFRESH_LIFETIME};
pub use user::{User, shard_dir, validate_username};
