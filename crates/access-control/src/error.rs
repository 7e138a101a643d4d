//! Error type for the access-control crate

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] auth_store::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
