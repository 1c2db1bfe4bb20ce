//! In-memory user cart store with failure injection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{MealId, UserId};
use tokio::sync::RwLock;

use crate::{NewUserCartItem, Result, UserCartError, UserCartItem, store::UserCartStore};

#[derive(Debug, Default)]
struct InMemoryUserCartState {
    items: Vec<UserCartItem>,
    next_id: i64,
    fail_on_read: bool,
    fail_on_write: bool,
}

impl InMemoryUserCartState {
    fn check_write(&self) -> Result<()> {
        if self.fail_on_write {
            return Err(UserCartError::Unavailable("write rejected".to_string()));
        }
        Ok(())
    }
}

/// In-memory user cart store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserCartStore {
    state: Arc<RwLock<InMemoryUserCartState>>,
}

impl InMemoryUserCartStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read fail.
    pub async fn set_fail_on_read(&self, fail: bool) {
        self.state.write().await.fail_on_read = fail;
    }

    /// Makes every subsequent insert, delete and update fail.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }

    /// Returns the number of stored items across all users.
    pub async fn item_count(&self) -> usize {
        self.state.read().await.items.len()
    }
}

#[async_trait]
impl UserCartStore for InMemoryUserCartStore {
    async fn get_items(&self, user_id: &UserId) -> Result<Vec<UserCartItem>> {
        let state = self.state.read().await;
        if state.fail_on_read {
            return Err(UserCartError::Unavailable("read rejected".to_string()));
        }

        Ok(state
            .items
            .iter()
            .filter(|item| &item.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_item(&self, item: NewUserCartItem) -> Result<UserCartItem> {
        let mut state = self.state.write().await;
        state.check_write()?;

        if item.quantity == 0 {
            return Err(UserCartError::InvalidQuantity(0));
        }
        if let Some(other) = state
            .items
            .iter()
            .find(|i| i.user_id == item.user_id && i.restaurant_id != item.restaurant_id)
        {
            return Err(UserCartError::CrossRestaurant {
                existing: other.restaurant_id.clone(),
                requested: item.restaurant_id,
            });
        }

        state.next_id += 1;
        let stored = UserCartItem {
            id: state.next_id,
            user_id: item.user_id,
            restaurant_id: item.restaurant_id,
            meal_id: item.meal_id,
            quantity: item.quantity,
            note: item.note,
            schedule_date: item.schedule_date,
            created_at: Utc::now(),
        };
        state.items.push(stored.clone());
        Ok(stored)
    }

    async fn delete_item(&self, user_id: &UserId, meal_id: &MealId) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_write()?;

        state
            .items
            .retain(|item| !(&item.user_id == user_id && &item.meal_id == meal_id));
        Ok(())
    }

    async fn update_quantity(
        &self,
        user_id: &UserId,
        meal_id: &MealId,
        quantity: u32,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        state.check_write()?;

        if quantity == 0 {
            return Err(UserCartError::InvalidQuantity(0));
        }

        match state
            .items
            .iter_mut()
            .find(|item| &item.user_id == user_id && &item.meal_id == meal_id)
        {
            Some(item) => {
                item.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
