//! Guest cart service providing the public API for guest cart operations.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{CartId, MealId, RestaurantId, UserId};
use kv_store::KeyValueStore;
use serde::Serialize;
use user_cart::{NewUserCartItem, UserCartError, UserCartStore};

use crate::error::{GuestCartError, Result};

use super::{
    CartItem, CartStats, GuestCart, GuestCartRepository, ItemPatch, LeaseExtension, MergeOutcome,
    MergeStrategy, NewCartItem,
};

/// Status of a guest cart as seen by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartValidation {
    pub cart_id: CartId,
    /// A record exists under the cart key.
    pub exists: bool,
    /// The record exists and decodes into a cart.
    pub is_valid: bool,
    pub item_count: u64,
    pub restaurant_id: Option<RestaurantId>,
    /// When the lease runs out; absent without a positive lease.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of a cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub cleaned_up: usize,
    /// Keyspace statistics taken after the pass.
    pub stats: CartStats,
}

/// Service for managing guest carts and merging them into user carts.
///
/// Wraps the guest cart repository and the durable user cart store.
pub struct GuestCartService<S: KeyValueStore, U: UserCartStore> {
    repository: GuestCartRepository<S>,
    user_carts: U,
}

impl<S: KeyValueStore, U: UserCartStore> GuestCartService<S, U> {
    /// Creates a service with a default guest cart repository over `store`.
    pub fn new(store: S, user_carts: U) -> Self {
        Self::with_repository(GuestCartRepository::new(store), user_carts)
    }

    /// Creates a service over an existing repository.
    pub fn with_repository(repository: GuestCartRepository<S>, user_carts: U) -> Self {
        Self {
            repository,
            user_carts,
        }
    }

    /// Returns a reference to the guest cart repository.
    pub fn repository(&self) -> &GuestCartRepository<S> {
        &self.repository
    }

    /// Returns a reference to the durable user cart store.
    pub fn user_carts(&self) -> &U {
        &self.user_carts
    }

    /// Issues a fresh cart identifier. Nothing is stored until the first
    /// item is added.
    pub fn generate_cart_id(&self) -> CartId {
        CartId::new()
    }

    /// Adds an item to a cart, creating the cart if needed.
    pub async fn add_to_cart(&self, cart_id: CartId, item: NewCartItem) -> Result<GuestCart> {
        self.repository.add_item_to_cart(cart_id, item).await
    }

    /// Loads a cart.
    pub async fn get_cart(&self, cart_id: CartId) -> Result<Option<GuestCart>> {
        self.repository.get_cart(cart_id).await
    }

    /// Updates an item. None if the cart or item does not exist.
    pub async fn update_item(
        &self,
        cart_id: CartId,
        meal_id: &MealId,
        patch: ItemPatch,
    ) -> Result<Option<GuestCart>> {
        self.repository.update_cart_item(cart_id, meal_id, patch).await
    }

    /// Removes an item. None if the cart does not exist.
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        meal_id: &MealId,
    ) -> Result<Option<GuestCart>> {
        self.repository.remove_item_from_cart(cart_id, meal_id).await
    }

    /// Empties a cart. None if the cart does not exist.
    pub async fn clear_cart(&self, cart_id: CartId) -> Result<Option<GuestCart>> {
        self.repository.clear_cart(cart_id).await
    }

    /// Deletes a cart. Returns true if a record was removed.
    pub async fn delete_cart(&self, cart_id: CartId) -> Result<bool> {
        self.repository.delete_cart(cart_id).await
    }

    /// Reports whether a cart exists, decodes, and when it expires.
    #[tracing::instrument(skip(self))]
    pub async fn validate_cart(&self, cart_id: CartId) -> Result<CartValidation> {
        if !self.repository.cart_exists(cart_id).await? {
            return Ok(CartValidation {
                cart_id,
                exists: false,
                is_valid: false,
                item_count: 0,
                restaurant_id: None,
                expires_at: None,
            });
        }

        let cart = self.repository.get_cart(cart_id).await?;
        let expires_at = self
            .repository
            .get_cart_ttl(cart_id)
            .await
            .remaining()
            .and_then(|remaining| chrono::Duration::from_std(remaining).ok())
            .map(|remaining| Utc::now() + remaining);

        Ok(CartValidation {
            cart_id,
            exists: true,
            is_valid: cart.is_some(),
            item_count: cart.as_ref().map_or(0, GuestCart::item_count),
            restaurant_id: cart.and_then(|c| c.restaurant_id().cloned()),
            expires_at,
        })
    }

    /// Replaces the lease of a cart. Returns false if the cart does not
    /// exist or the store failed.
    pub async fn extend_expiry(&self, cart_id: CartId, extension: LeaseExtension) -> bool {
        self.repository
            .extend_cart_ttl(cart_id, extension.as_duration())
            .await
    }

    /// Deletes carts without a positive lease and reports keyspace stats.
    pub async fn cleanup_expired_carts(&self) -> Result<CleanupReport> {
        let cleaned_up = self.repository.cleanup_expired_carts().await?;
        let stats = self.repository.get_cart_stats().await;
        Ok(CleanupReport { cleaned_up, stats })
    }

    /// Merges a guest cart into a user's durable cart, then deletes the
    /// guest cart.
    ///
    /// Items are processed in cart order. A guest item whose meal is
    /// already in the user cart is a conflict, resolved by `strategy`.
    /// The merge is not transactional: if the durable store fails midway,
    /// items written so far stay written and the guest cart is kept, so a
    /// retry with [`MergeStrategy::AddQuantities`] adds them again.
    #[tracing::instrument(skip(self))]
    pub async fn merge_guest_cart_to_user(
        &self,
        guest_cart_id: CartId,
        user_id: &UserId,
        strategy: MergeStrategy,
    ) -> Result<MergeOutcome> {
        let started = Instant::now();

        let guest_cart = match self.repository.get_cart(guest_cart_id).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Ok(MergeOutcome::empty()),
        };

        let merge_err = |source: UserCartError| GuestCartError::Merge {
            user_id: user_id.clone(),
            source,
        };

        let mut durable: HashMap<MealId, u32> = HashMap::new();
        for item in self.user_carts.get_items(user_id).await.map_err(merge_err)? {
            durable.entry(item.meal_id).or_insert(item.quantity);
        }

        let mut merged = 0;
        let mut conflicts = 0;
        for item in guest_cart.items() {
            match (durable.get_mut(&item.meal_id), strategy) {
                (Some(quantity), MergeStrategy::AddQuantities) => {
                    *quantity = quantity.saturating_add(item.quantity.get());
                    let updated = self
                        .user_carts
                        .update_quantity(user_id, &item.meal_id, *quantity)
                        .await
                        .map_err(merge_err)?;
                    if updated {
                        conflicts += 1;
                    } else {
                        // The durable line was removed after it was read.
                        tracing::warn!(
                            %user_id,
                            meal_id = %item.meal_id,
                            "User cart line vanished during merge, inserting guest item"
                        );
                        self.user_carts
                            .insert_item(to_user_item(user_id, item))
                            .await
                            .map_err(merge_err)?;
                    }
                }
                (Some(_), MergeStrategy::Replace) => {
                    self.user_carts
                        .delete_item(user_id, &item.meal_id)
                        .await
                        .map_err(merge_err)?;
                    self.user_carts
                        .insert_item(to_user_item(user_id, item))
                        .await
                        .map_err(merge_err)?;
                    conflicts += 1;
                }
                (None, _) => {
                    self.user_carts
                        .insert_item(to_user_item(user_id, item))
                        .await
                        .map_err(merge_err)?;
                }
            }
            merged += 1;
        }

        let user_cart_items = self.user_carts.get_items(user_id).await.map_err(merge_err)?;

        if let Err(err) = self.repository.delete_cart(guest_cart_id).await {
            tracing::warn!(
                %guest_cart_id,
                error = %err,
                "Merged guest cart could not be deleted"
            );
        }

        metrics::counter!("guest_cart_merges_total", "strategy" => strategy.as_str())
            .increment(1);
        metrics::histogram!("guest_cart_merge_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            %guest_cart_id,
            %user_id,
            merged,
            conflicts,
            "Merged guest cart into user cart"
        );

        Ok(MergeOutcome::merged(merged, conflicts, user_cart_items))
    }
}

fn to_user_item(user_id: &UserId, item: &CartItem) -> NewUserCartItem {
    NewUserCartItem {
        user_id: user_id.clone(),
        restaurant_id: item.restaurant_id.clone(),
        meal_id: item.meal_id.clone(),
        quantity: item.quantity.get(),
        note: item.note.clone().map(String::from),
        schedule_date: item.schedule_date,
    }
}
