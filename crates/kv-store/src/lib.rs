//! TTL-aware key-value store layer.
//!
//! - [`KeyValueStore`] trait: string-keyed values with a per-key lease,
//!   glob key enumeration, hash-field sub-storage and a liveness check
//! - [`StoredValue`] tagged envelope so decoding is explicit
//! - [`InMemoryKeyValueStore`] for tests and local runs
//! - [`RedisKeyValueStore`] with an explicit connect/close lifecycle

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;
pub mod value;

pub use error::{KvError, Result};
pub use memory::InMemoryKeyValueStore;
pub use redis_store::{RedisConfig, RedisKeyValueStore};
pub use store::{KeyValueStore, Ttl};
pub use value::StoredValue;
