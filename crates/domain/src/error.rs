//! Domain error types.

use common::UserId;
use kv_store::KvError;
use thiserror::Error;
use user_cart::UserCartError;

use crate::cart::CartError;

/// Errors that can occur during guest cart operations.
#[derive(Debug, Error)]
pub enum GuestCartError {
    /// A cart rule or boundary value was violated.
    #[error("Validation error: {0}")]
    Validation(#[from] CartError),

    /// Cart or item absent where the caller requires it.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The key-value store failed to write or could not be reached.
    #[error("Storage error: {0}")]
    Storage(#[from] KvError),

    /// The durable user cart failed mid-merge.
    #[error("Merge into cart of user {user_id} failed: {source}")]
    Merge {
        user_id: UserId,
        #[source]
        source: UserCartError,
    },
}

impl GuestCartError {
    /// Returns true for caller errors, as opposed to infrastructure failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type for guest cart operations.
pub type Result<T> = std::result::Result<T, GuestCartError>;
