//! Value objects for the guest cart domain.

use chrono::{DateTime, Utc};
use common::{MealId, RestaurantId};
use serde::{Deserialize, Serialize};

use super::CartError;

/// Maximum length of an item note, in characters.
pub const MAX_NOTE_CHARS: usize = 500;

/// Quantity of a cart item. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Creates a quantity, rejecting zero.
    pub fn new(value: u32) -> Result<Self, CartError> {
        if value == 0 {
            return Err(CartError::InvalidQuantity { quantity: value });
        }
        Ok(Self(value))
    }

    /// A quantity of one.
    pub fn one() -> Self {
        Self(1)
    }

    /// Returns the quantity as a plain number.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Adds two quantities, saturating at `u32::MAX`.
    pub fn saturating_add(self, other: Quantity) -> Quantity {
        Self(self.0.saturating_add(other.0))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::one()
    }
}

impl TryFrom<u32> for Quantity {
    type Error = CartError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Free-text note attached to a cart item, at most 500 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Note(String);

impl Note {
    /// Creates a note, rejecting text longer than [`MAX_NOTE_CHARS`].
    pub fn new(text: impl Into<String>) -> Result<Self, CartError> {
        let text = text.into();
        let length = text.chars().count();
        if length > MAX_NOTE_CHARS {
            return Err(CartError::NoteTooLong { length });
        }
        Ok(Self(text))
    }

    /// Returns the note text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Note {
    type Error = CartError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::new(text)
    }
}

impl From<Note> for String {
    fn from(note: Note) -> Self {
        note.0
    }
}

impl AsRef<str> for Note {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A line in a guest cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Meal ordered; unique within a cart.
    pub meal_id: MealId,
    pub restaurant_id: RestaurantId,
    pub quantity: Quantity,
    pub note: Option<Note>,
    /// Requested delivery time, if any.
    pub schedule_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An item to add to a guest cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub restaurant_id: RestaurantId,
    pub meal_id: MealId,
    pub quantity: Quantity,
    pub note: Option<Note>,
    pub schedule_date: Option<DateTime<Utc>>,
}

impl NewCartItem {
    /// Creates an item without note or schedule.
    pub fn new(
        restaurant_id: impl Into<RestaurantId>,
        meal_id: impl Into<MealId>,
        quantity: Quantity,
    ) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            meal_id: meal_id.into(),
            quantity,
            note: None,
            schedule_date: None,
        }
    }

    /// Attaches a note.
    pub fn with_note(mut self, note: Note) -> Self {
        self.note = Some(note);
        self
    }

    /// Attaches a requested delivery time.
    pub fn with_schedule_date(mut self, schedule_date: DateTime<Utc>) -> Self {
        self.schedule_date = Some(schedule_date);
        self
    }

    pub(crate) fn into_item(self, created_at: DateTime<Utc>) -> CartItem {
        CartItem {
            meal_id: self.meal_id,
            restaurant_id: self.restaurant_id,
            quantity: self.quantity,
            note: self.note,
            schedule_date: self.schedule_date,
            created_at,
        }
    }
}

/// Partial update of a cart item. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub quantity: Option<Quantity>,
    pub note: Option<Note>,
    pub schedule_date: Option<DateTime<Utc>>,
}

impl ItemPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the new quantity.
    pub fn quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Sets the new note.
    pub fn note(mut self, note: Note) -> Self {
        self.note = Some(note);
        self
    }

    /// Sets the new delivery time.
    pub fn schedule_date(mut self, schedule_date: DateTime<Utc>) -> Self {
        self.schedule_date = Some(schedule_date);
        self
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.note.is_none() && self.schedule_date.is_none()
    }
}
