use async_trait::async_trait;
use common::{MealId, RestaurantId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{NewUserCartItem, Result, UserCartError, UserCartItem, store::UserCartStore};

const ITEM_COLUMNS: &str =
    "id, user_id, restaurant_id, meal_id, quantity, note, schedule_date, created_at";

/// PostgreSQL-backed user cart store over the `cart_items` table.
#[derive(Clone)]
pub struct PostgresUserCartStore {
    pool: PgPool,
}

impl PostgresUserCartStore {
    /// Creates a new PostgreSQL user cart store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_item(row: PgRow) -> Result<UserCartItem> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(UserCartError::InvalidQuantity(quantity.into()))?;

        Ok(UserCartItem {
            id: row.try_get("id")?,
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            restaurant_id: RestaurantId::new(row.try_get::<String, _>("restaurant_id")?),
            meal_id: MealId::new(row.try_get::<String, _>("meal_id")?),
            quantity,
            note: row.try_get("note")?,
            schedule_date: row.try_get("schedule_date")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn to_db_quantity(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or(UserCartError::InvalidQuantity(quantity.into()))
}

#[async_trait]
impl UserCartStore for PostgresUserCartStore {
    async fn get_items(&self, user_id: &UserId) -> Result<Vec<UserCartItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY id ASC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    #[tracing::instrument(
        skip(self, item),
        fields(user_id = %item.user_id, meal_id = %item.meal_id)
    )]
    async fn insert_item(&self, item: NewUserCartItem) -> Result<UserCartItem> {
        let quantity = to_db_quantity(item.quantity)?;

        let mut tx = self.pool.begin().await?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT restaurant_id FROM cart_items WHERE user_id = $1 AND restaurant_id <> $2 LIMIT 1",
        )
        .bind(item.user_id.as_str())
        .bind(item.restaurant_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(existing) = existing {
            return Err(UserCartError::CrossRestaurant {
                existing: RestaurantId::new(existing),
                requested: item.restaurant_id,
            });
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO cart_items (user_id, restaurant_id, meal_id, quantity, note, schedule_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item.user_id.as_str())
        .bind(item.restaurant_id.as_str())
        .bind(item.meal_id.as_str())
        .bind(quantity)
        .bind(&item.note)
        .bind(item.schedule_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Self::row_to_item(row)
    }

    async fn delete_item(&self, user_id: &UserId, meal_id: &MealId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND meal_id = $2")
            .bind(user_id.as_str())
            .bind(meal_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_quantity(
        &self,
        user_id: &UserId,
        meal_id: &MealId,
        quantity: u32,
    ) -> Result<bool> {
        let quantity = to_db_quantity(quantity)?;

        let result =
            sqlx::query("UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND meal_id = $2")
                .bind(user_id.as_str())
                .bind(meal_id.as_str())
                .bind(quantity)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
