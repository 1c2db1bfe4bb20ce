//! Types for merging a guest cart into a user's durable cart.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use user_cart::UserCartItem;

use super::CartError;

/// How a guest item is reconciled with a durable item for the same meal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum MergeStrategy {
    /// Add the guest quantity to the durable quantity.
    #[default]
    AddQuantities,
    /// Drop the durable item and insert the guest item in its place.
    Replace,
}

impl MergeStrategy {
    /// Returns the strategy's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddQuantities => "add_quantities",
            Self::Replace => "replace",
        }
    }
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = CartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add_quantities" => Ok(Self::AddQuantities),
            "replace" => Ok(Self::Replace),
            other => Err(CartError::UnknownMergeStrategy {
                strategy: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for MergeStrategy {
    type Error = CartError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Result of merging a guest cart into a user cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub message: String,
    /// Guest items written to the durable cart.
    pub merged_items_count: usize,
    /// Guest items whose meal was already in the durable cart.
    pub conflicts_resolved: usize,
    /// The durable cart after the merge.
    pub user_cart_items: Vec<UserCartItem>,
}

impl MergeOutcome {
    /// Outcome for a guest cart that is absent or has no items.
    pub fn empty() -> Self {
        Self {
            message: "Anonymous cart is empty or not found".to_string(),
            merged_items_count: 0,
            conflicts_resolved: 0,
            user_cart_items: Vec::new(),
        }
    }

    pub(crate) fn merged(
        merged_items_count: usize,
        conflicts_resolved: usize,
        user_cart_items: Vec<UserCartItem>,
    ) -> Self {
        Self {
            message: format!("Successfully merged {merged_items_count} items to user cart"),
            merged_items_count,
            conflicts_resolved,
            user_cart_items,
        }
    }
}

/// A requested lease extension, between 1 and 365 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeaseExtension {
    days: u32,
}

impl LeaseExtension {
    pub const MIN_DAYS: u32 = 1;
    pub const MAX_DAYS: u32 = 365;
    pub const DEFAULT_DAYS: u32 = 30;

    /// Validates a number of days.
    pub fn from_days(days: i64) -> Result<Self, CartError> {
        match u32::try_from(days) {
            Ok(days) if (Self::MIN_DAYS..=Self::MAX_DAYS).contains(&days) => Ok(Self { days }),
            _ => Err(CartError::ExtensionOutOfRange { days }),
        }
    }

    /// Returns the number of days.
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Returns the lease length.
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.days) * 24 * 60 * 60)
    }
}

impl Default for LeaseExtension {
    fn default() -> Self {
        Self {
            days: Self::DEFAULT_DAYS,
        }
    }
}
