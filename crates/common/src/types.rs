use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Length of the hyphenated text form of a cart id.
const CART_ID_LEN: usize = 36;

/// Reasons a text is not a cart id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartIdError {
    #[error("Cart id must be 36 characters, got {0}")]
    Length(usize),

    #[error("Invalid cart id: {0}")]
    Malformed(#[from] uuid::Error),

    #[error("Cart id must be a version 4 UUID, got version {0}")]
    Version(usize),
}

/// Identifier of an anonymous (guest) cart.
///
/// Wraps a v4 UUID. The identifier is held by the client and is not tied
/// to any account; its text form is the 36-character hyphenated UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CartId(Uuid);

impl CartId {
    /// Creates a new random cart ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a cart ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a cart ID from its hyphenated text form.
    ///
    /// Only the 36-character hyphenated form of a version 4 UUID is
    /// accepted; simple, braced and URN forms are rejected.
    pub fn parse(s: &str) -> Result<Self, CartIdError> {
        if s.len() != CART_ID_LEN {
            return Err(CartIdError::Length(s.len()));
        }
        let uuid = Uuid::parse_str(s)?;
        match uuid.get_version_num() {
            4 => Ok(Self(uuid)),
            version => Err(CartIdError::Version(version)),
        }
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CartId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CartId {
    type Err = CartIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for CartId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<CartId> for Uuid {
    fn from(id: CartId) -> Self {
        id.0
    }
}

impl TryFrom<String> for CartId {
    type Error = CartIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<CartId> for String {
    fn from(id: CartId) -> Self {
        id.to_string()
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a signed-in user, as issued by the auth service.
    UserId
);

string_id!(
    /// Identifier of a meal on a restaurant menu.
    MealId
);

string_id!(
    /// Identifier of a restaurant.
    RestaurantId
);
