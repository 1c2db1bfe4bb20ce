//! Domain layer for the guest cart engine.
//!
//! This crate provides:
//! - GuestCart aggregate with the single-restaurant rule
//! - GuestCartRepository storing carts as leased key-value records
//! - GuestCartService, including merging a guest cart into a user cart

pub mod cart;
pub mod error;

pub use cart::{
    CART_KEY_PREFIX, CartError, CartItem, CartStats, CartValidation, CleanupReport, DEFAULT_LEASE,
    GuestCart, GuestCartRepository, GuestCartService, ItemPatch, LeaseExtension, MAX_NOTE_CHARS,
    MergeOutcome, MergeStrategy, NewCartItem, Note, Quantity,
};
pub use error::{GuestCartError, Result};
