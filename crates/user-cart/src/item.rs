use chrono::{DateTime, Utc};
use common::{MealId, RestaurantId, UserId};
use serde::{Deserialize, Serialize};

/// A line of a signed-in user's durable cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCartItem {
    /// Store-assigned row id; increases with insertion order.
    pub id: i64,
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub meal_id: MealId,
    pub quantity: u32,
    pub note: Option<String>,
    pub schedule_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An item to insert into a user's durable cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserCartItem {
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub meal_id: MealId,
    pub quantity: u32,
    pub note: Option<String>,
    pub schedule_date: Option<DateTime<Utc>>,
}
