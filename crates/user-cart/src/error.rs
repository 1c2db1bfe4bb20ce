use common::RestaurantId;
use thiserror::Error;

/// Errors that can occur when interacting with the durable user cart.
#[derive(Debug, Error)]
pub enum UserCartError {
    /// Quantities below one are never stored.
    #[error("Invalid quantity {0}: must be at least 1")]
    InvalidQuantity(i64),

    /// The user's cart already holds items from another restaurant.
    #[error("User cart already has items from restaurant {existing}, cannot add from {requested}")]
    CrossRestaurant {
        existing: RestaurantId,
        requested: RestaurantId,
    },

    /// The store refused the operation.
    #[error("User cart store unavailable: {0}")]
    Unavailable(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for user cart operations.
pub type Result<T> = std::result::Result<T, UserCartError>;
