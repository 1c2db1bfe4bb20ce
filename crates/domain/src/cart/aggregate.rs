//! Guest cart aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CartId, MealId, RestaurantId};
use serde::{Deserialize, Serialize};

use super::{CartError, CartItem, ItemPatch, NewCartItem};

/// Guest cart aggregate root.
///
/// An ephemeral cart owned by an anonymous visitor. A non-empty cart belongs
/// to exactly one restaurant; items are unique by meal and kept in the order
/// they were first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCart {
    cart_id: CartId,

    /// Set by the first item, cleared when the cart becomes empty.
    restaurant_id: Option<RestaurantId>,

    items: Vec<CartItem>,

    created_at: DateTime<Utc>,

    updated_at: DateTime<Utc>,
}

impl GuestCart {
    /// Creates an empty cart.
    pub fn new(cart_id: CartId) -> Self {
        let now = Utc::now();
        Self {
            cart_id,
            restaurant_id: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

// Query methods
impl GuestCart {
    /// Returns the cart ID.
    pub fn cart_id(&self) -> CartId {
        self.cart_id
    }

    /// Returns the restaurant all items belong to, if the cart is non-empty.
    pub fn restaurant_id(&self) -> Option<&RestaurantId> {
        self.restaurant_id.as_ref()
    }

    /// Returns the items in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Returns the item for a meal.
    pub fn get_item(&self, meal_id: &MealId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.meal_id == meal_id)
    }

    /// Returns the total quantity over all items.
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Returns true if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// Command methods
impl GuestCart {
    /// Adds an item to the cart.
    ///
    /// Re-adding a meal already in the cart increases its quantity; the
    /// note and schedule of the existing item are kept. Fails without
    /// touching the cart if the cart holds items of another restaurant.
    pub fn add_item(&mut self, item: NewCartItem) -> Result<(), CartError> {
        if let Some(current) = &self.restaurant_id
            && current != &item.restaurant_id
        {
            return Err(CartError::CrossRestaurant {
                cart_restaurant: current.clone(),
                requested: item.restaurant_id,
            });
        }

        let now = Utc::now();
        match self
            .items
            .iter_mut()
            .find(|existing| existing.meal_id == item.meal_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            }
            None => {
                self.restaurant_id = Some(item.restaurant_id.clone());
                self.items.push(item.into_item(now));
            }
        }

        self.updated_at = now;
        Ok(())
    }

    /// Removes the item for a meal. Returns true if an item was removed.
    ///
    /// Removing an absent meal is a no-op apart from the timestamp.
    pub fn remove_item(&mut self, meal_id: &MealId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.meal_id != meal_id);

        if self.items.is_empty() {
            self.restaurant_id = None;
        }
        self.updated_at = Utc::now();

        self.items.len() != before
    }

    /// Applies a partial update to the item for a meal.
    ///
    /// Returns false, leaving the cart untouched, if the meal is absent.
    pub fn update_item(&mut self, meal_id: &MealId, patch: ItemPatch) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| &item.meal_id == meal_id) else {
            return false;
        };

        if let Some(quantity) = patch.quantity {
            item.quantity = quantity;
        }
        if let Some(note) = patch.note {
            item.note = Some(note);
        }
        if let Some(schedule_date) = patch.schedule_date {
            item.schedule_date = Some(schedule_date);
        }

        self.updated_at = Utc::now();
        true
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.items.clear();
        self.restaurant_id = None;
        self.updated_at = Utc::now();
    }
}
