//! Durable per-user cart store.
//!
//! The guest cart merge only needs a narrow view of the signed-in user's
//! cart, captured by [`UserCartStore`]:
//!
//! - [`InMemoryUserCartStore`] for tests, with failure injection
//! - [`PostgresUserCartStore`] over the `cart_items` table

pub mod error;
pub mod item;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, UserCartError};
pub use item::{NewUserCartItem, UserCartItem};
pub use memory::InMemoryUserCartStore;
pub use postgres::PostgresUserCartStore;
pub use store::UserCartStore;
