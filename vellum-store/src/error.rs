use thiserror::Error;
use uuid::Uuid;
use vellum_core::{ModelError, UserId};

use crate::node::StoreError;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Document {id} is locked by {holder}")]
    AlreadyLocked { id: Uuid, holder: UserId },
    #[error("Document {0} is not checked out")]
    NotLocked(Uuid),
    #[error("Name collision: {0}")]
    NameCollision(String),
    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl RepositoryError {
    pub(crate) fn not_found(id: Uuid) -> Self {
        RepositoryError::NotFound(id.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
