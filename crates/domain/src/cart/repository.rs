//! Guest cart persistence on top of a key-value store.

use std::time::Duration;

use common::{CartId, MealId};
use kv_store::{KeyValueStore, KvError, StoredValue, Ttl};
use serde::Serialize;

use crate::error::Result;

use super::{GuestCart, ItemPatch, NewCartItem};

/// Key namespace of guest carts.
pub const CART_KEY_PREFIX: &str = "cart:anon:";

/// Lease given to a cart on every save: 30 days.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Carts with less than this many seconds left count as expiring soon.
const EXPIRING_SOON_SECS: u64 = 24 * 60 * 60;

/// Snapshot of the guest cart keyspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CartStats {
    pub total_carts: usize,
    /// Carts with a positive lease.
    pub active_carts: usize,
    /// Active carts with less than a day left.
    pub expiring_soon: usize,
    /// Everything that is not active.
    pub expired_carts: usize,
}

/// Repository for guest carts.
///
/// Each cart is one record at `cart:anon:<cart id>` holding the encoded
/// aggregate. Every save writes the whole record and resets its lease;
/// reads never touch the lease. Read-modify-write helpers are not atomic:
/// concurrent writers to the same cart resolve last-write-wins.
#[derive(Clone)]
pub struct GuestCartRepository<S: KeyValueStore> {
    store: S,
    lease: Duration,
}

impl<S: KeyValueStore> GuestCartRepository<S> {
    /// Creates a repository with the default 30 day lease.
    pub fn new(store: S) -> Self {
        Self {
            store,
            lease: DEFAULT_LEASE,
        }
    }

    /// Overrides the lease applied on every save.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Returns the lease applied on every save.
    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the store key of a cart.
    pub fn cart_key(cart_id: CartId) -> String {
        format!("{CART_KEY_PREFIX}{cart_id}")
    }

    /// Persists a fresh empty cart.
    #[tracing::instrument(skip(self))]
    pub async fn create_cart(&self, cart_id: CartId) -> Result<GuestCart> {
        let cart = GuestCart::new(cart_id);
        self.save_cart(&cart).await?;
        tracing::info!(%cart_id, "Created guest cart");
        Ok(cart)
    }

    /// Loads a cart.
    ///
    /// A record that cannot be decoded, or that holds a different cart id
    /// than its key, is treated as absent.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: CartId) -> Result<Option<GuestCart>> {
        let key = Self::cart_key(cart_id);

        let value = match self.store.get(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(None),
            Err(err @ (KvError::Decode { .. } | KvError::WrongType { .. })) => {
                tracing::warn!(%cart_id, error = %err, "Unreadable guest cart record");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        match value.decode::<GuestCart>() {
            Ok(cart) if cart.cart_id() == cart_id => Ok(Some(cart)),
            Ok(cart) => {
                tracing::warn!(
                    %cart_id,
                    stored_cart_id = %cart.cart_id(),
                    "Guest cart record holds another cart id"
                );
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(%cart_id, error = %err, "Failed to decode guest cart");
                Ok(None)
            }
        }
    }

    /// Writes a cart and resets its lease.
    #[tracing::instrument(skip(self, cart), fields(cart_id = %cart.cart_id()))]
    pub async fn save_cart(&self, cart: &GuestCart) -> Result<()> {
        let value = StoredValue::encode(cart)?;
        self.store
            .set(&Self::cart_key(cart.cart_id()), value, Some(self.lease))
            .await?;

        metrics::counter!("guest_cart_saves_total").increment(1);
        tracing::debug!(items = cart.items().len(), "Saved guest cart");
        Ok(())
    }

    /// Deletes a cart. Returns true if a record was removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_cart(&self, cart_id: CartId) -> Result<bool> {
        let deleted = self.store.delete(&Self::cart_key(cart_id)).await?;
        if deleted {
            tracing::info!(%cart_id, "Deleted guest cart");
        }
        Ok(deleted)
    }

    /// Checks whether a record exists for the cart.
    pub async fn cart_exists(&self, cart_id: CartId) -> Result<bool> {
        Ok(self.store.exists(&Self::cart_key(cart_id)).await?)
    }

    /// Adds an item, creating the cart if it does not exist yet.
    #[tracing::instrument(skip(self, item), fields(meal_id = %item.meal_id))]
    pub async fn add_item_to_cart(&self, cart_id: CartId, item: NewCartItem) -> Result<GuestCart> {
        let mut cart = match self.get_cart(cart_id).await? {
            Some(cart) => cart,
            None => GuestCart::new(cart_id),
        };

        if let Err(err) = cart.add_item(item) {
            tracing::warn!(%cart_id, error = %err, "Rejected item for guest cart");
            return Err(err.into());
        }

        self.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Removes an item. Returns None if the cart does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item_from_cart(
        &self,
        cart_id: CartId,
        meal_id: &MealId,
    ) -> Result<Option<GuestCart>> {
        let Some(mut cart) = self.get_cart(cart_id).await? else {
            return Ok(None);
        };

        cart.remove_item(meal_id);
        self.save_cart(&cart).await?;
        Ok(Some(cart))
    }

    /// Updates an item. Returns None, without writing, if the cart or the
    /// item does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn update_cart_item(
        &self,
        cart_id: CartId,
        meal_id: &MealId,
        patch: ItemPatch,
    ) -> Result<Option<GuestCart>> {
        let Some(mut cart) = self.get_cart(cart_id).await? else {
            return Ok(None);
        };

        if !cart.update_item(meal_id, patch) {
            return Ok(None);
        }

        self.save_cart(&cart).await?;
        Ok(Some(cart))
    }

    /// Empties a cart. Returns None if the cart does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, cart_id: CartId) -> Result<Option<GuestCart>> {
        let Some(mut cart) = self.get_cart(cart_id).await? else {
            return Ok(None);
        };

        cart.clear();
        self.save_cart(&cart).await?;
        Ok(Some(cart))
    }

    /// Returns the remaining lease of a cart.
    ///
    /// Store failures are logged and reported as [`Ttl::Persistent`].
    pub async fn get_cart_ttl(&self, cart_id: CartId) -> Ttl {
        match self.store.ttl(&Self::cart_key(cart_id)).await {
            Ok(ttl) => ttl,
            Err(err) => {
                tracing::warn!(%cart_id, error = %err, "Failed to read guest cart lease");
                Ttl::Persistent
            }
        }
    }

    /// Replaces the lease of a cart. Returns false if the cart does not
    /// exist or the store failed.
    #[tracing::instrument(skip(self))]
    pub async fn extend_cart_ttl(&self, cart_id: CartId, lease: Duration) -> bool {
        match self.store.expire(&Self::cart_key(cart_id), lease).await {
            Ok(extended) => extended,
            Err(err) => {
                tracing::warn!(%cart_id, error = %err, "Failed to extend guest cart lease");
                false
            }
        }
    }

    /// Returns the ids of carts without a positive lease.
    ///
    /// Keys whose suffix is not a cart id are skipped here but still swept
    /// by [`cleanup_expired_carts`](Self::cleanup_expired_carts).
    pub async fn scan_expired_carts(&self) -> Vec<CartId> {
        self.scan_expired_keys()
            .await
            .iter()
            .filter_map(|key| key.strip_prefix(CART_KEY_PREFIX))
            .filter_map(|id| CartId::parse(id).ok())
            .collect()
    }

    /// Deletes every cart record without a positive lease.
    ///
    /// Returns the number of records deleted. Records are never decoded, so
    /// corrupt records are swept like any other.
    #[tracing::instrument(skip(self))]
    pub async fn cleanup_expired_carts(&self) -> Result<usize> {
        let mut deleted = 0;
        for key in self.scan_expired_keys().await {
            if self.store.delete(&key).await? {
                deleted += 1;
            }
        }

        if deleted > 0 {
            metrics::counter!("guest_cart_cleanup_deleted_total").increment(deleted as u64);
            tracing::info!(deleted, "Cleaned up expired guest carts");
        }
        Ok(deleted)
    }

    /// Counts carts by lease state. Store failures yield all zeros.
    pub async fn get_cart_stats(&self) -> CartStats {
        match self.collect_stats().await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to collect guest cart stats");
                CartStats::default()
            }
        }
    }

    async fn collect_stats(&self) -> std::result::Result<CartStats, KvError> {
        let keys = self.store.scan_keys(&cart_pattern()).await?;

        let mut stats = CartStats {
            total_carts: keys.len(),
            ..CartStats::default()
        };
        for key in &keys {
            if let Ttl::Expires(secs) = self.store.ttl(key).await?
                && secs > 0
            {
                stats.active_carts += 1;
                if secs < EXPIRING_SOON_SECS {
                    stats.expiring_soon += 1;
                }
            }
        }
        stats.expired_carts = stats.total_carts - stats.active_carts;
        Ok(stats)
    }

    /// Keys in the cart namespace whose lease is not positive.
    ///
    /// Scan failures yield an empty list; a key whose lease cannot be read
    /// is left alone.
    async fn scan_expired_keys(&self) -> Vec<String> {
        let keys = match self.store.scan_keys(&cart_pattern()).await {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to scan guest carts");
                return Vec::new();
            }
        };

        let mut expired = Vec::new();
        for key in keys {
            match self.store.ttl(&key).await {
                Ok(ttl) if !ttl.is_live() => expired.push(key),
                Ok(_) => {}
                Err(err) => tracing::warn!(%key, error = %err, "Failed to read lease"),
            }
        }
        expired
    }
}

fn cart_pattern() -> String {
    format!("{CART_KEY_PREFIX}*")
}
