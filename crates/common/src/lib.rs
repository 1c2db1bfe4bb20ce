//! Shared identifier types for the guest cart engine.

mod types;

pub use types::{CartId, CartIdError, MealId, RestaurantId, UserId};
