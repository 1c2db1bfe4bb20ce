//! Guest cart aggregate and related types.

mod aggregate;
mod merge;
mod repository;
mod service;
mod value_objects;

pub use aggregate::GuestCart;
pub use merge::{LeaseExtension, MergeOutcome, MergeStrategy};
pub use repository::{CART_KEY_PREFIX, CartStats, DEFAULT_LEASE, GuestCartRepository};
pub use service::{CartValidation, CleanupReport, GuestCartService};
pub use value_objects::{CartItem, ItemPatch, MAX_NOTE_CHARS, NewCartItem, Note, Quantity};

use common::RestaurantId;
use thiserror::Error;

/// Validation errors raised by the guest cart and its boundary types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The cart already holds items of another restaurant.
    #[error("Cannot add item from restaurant {requested}: cart holds items from {cart_restaurant}")]
    CrossRestaurant {
        cart_restaurant: RestaurantId,
        requested: RestaurantId,
    },

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// Note exceeds the length limit.
    #[error("Note too long: {length} characters (max {MAX_NOTE_CHARS})")]
    NoteTooLong { length: usize },

    /// Merge strategy name not recognized.
    #[error("Unknown merge strategy: {strategy}")]
    UnknownMergeStrategy { strategy: String },

    /// Lease extension outside 1..=365 days.
    #[error("Lease extension of {days} days is out of range (1-365)")]
    ExtensionOutOfRange { days: i64 },
}
