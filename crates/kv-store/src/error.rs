use thiserror::Error;

/// Errors that can occur when interacting with the key-value store.
#[derive(Debug, Error)]
pub enum KvError {
    /// The client was never connected or has been closed.
    #[error("Key-value store is not connected")]
    NotConnected,

    /// The store did not answer within the configured operation timeout.
    #[error("Key-value store operation '{operation}' timed out")]
    Timeout { operation: &'static str },

    /// The key holds a value of a different kind than the operation expects.
    #[error("Wrong kind of value stored at key {key}")]
    WrongType { key: String },

    /// The stored text is not a valid value envelope.
    #[error("Failed to decode value stored at key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An error reported by the Redis client.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type for key-value store operations.
pub type Result<T> = std::result::Result<T, KvError>;
