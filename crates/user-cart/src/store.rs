use async_trait::async_trait;
use common::{MealId, UserId};

use crate::{NewUserCartItem, Result, UserCartItem};

/// Durable cart of a signed-in user.
///
/// A user cart holds items of a single restaurant; `insert_item` rejects
/// an item from any other restaurant with
/// [`UserCartError::CrossRestaurant`](crate::UserCartError::CrossRestaurant).
#[async_trait]
pub trait UserCartStore: Send + Sync {
    /// Returns the user's items in insertion order.
    async fn get_items(&self, user_id: &UserId) -> Result<Vec<UserCartItem>>;

    /// Inserts a new item and returns it with its assigned id.
    async fn insert_item(&self, item: NewUserCartItem) -> Result<UserCartItem>;

    /// Deletes every item of the user with the given meal.
    async fn delete_item(&self, user_id: &UserId, meal_id: &MealId) -> Result<()>;

    /// Overwrites the quantity of the user's item for the given meal.
    ///
    /// Returns false if the user has no such item.
    async fn update_quantity(
        &self,
        user_id: &UserId,
        meal_id: &MealId,
        quantity: u32,
    ) -> Result<bool>;
}
