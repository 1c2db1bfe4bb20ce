use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::{Result, StoredValue};

/// Remaining lease of a key.
///
/// Mirrors the Redis `TTL` reply: a non-negative number of seconds, `-1` for
/// a key without a lease and `-2` for an absent key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// The key expires after this many whole seconds.
    Expires(u64),
    /// The key exists but carries no lease.
    Persistent,
    /// The key does not exist.
    Missing,
}

impl Ttl {
    /// Converts a raw Redis `TTL` reply.
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            -1 => Self::Persistent,
            s if s >= 0 => Self::Expires(s as u64),
            _ => Self::Missing,
        }
    }

    /// Returns the integer form: seconds, `-1` or `-2`.
    pub fn as_secs(&self) -> i64 {
        match self {
            Self::Expires(secs) => *secs as i64,
            Self::Persistent => -1,
            Self::Missing => -2,
        }
    }

    /// Returns the remaining lease, if the key has a positive one.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Expires(secs) if *secs > 0 => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Returns true if the key has a strictly positive lease.
    pub fn is_live(&self) -> bool {
        self.as_secs() > 0
    }
}

impl std::fmt::Display for Ttl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_secs())
    }
}

/// Core trait for key-value store clients.
///
/// The store is string-keyed, holds [`StoredValue`] envelopes and enforces
/// per-key leases on its own. It knows nothing about what the values mean.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Writes a value, replacing any previous one.
    ///
    /// With `ttl` the key gets a fresh lease; without it the key is
    /// persistent (any previous lease is discarded).
    async fn set(&self, key: &str, value: StoredValue, ttl: Option<Duration>) -> Result<()>;

    /// Reads a value. Returns None if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<StoredValue>>;

    /// Deletes a key. Returns true if a key was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Checks whether a key exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Replaces the lease of an existing key.
    ///
    /// Returns false if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Returns the remaining lease of a key.
    async fn ttl(&self, key: &str) -> Result<Ttl>;

    /// Enumerates keys matching a glob pattern (`*`, `?`).
    ///
    /// Best-effort and non-transactional: keys written or expiring during
    /// the scan may or may not be reported.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Sets a field of the hash stored at `key`.
    ///
    /// Returns true if the field is new.
    async fn hset(&self, key: &str, field: &str, value: StoredValue) -> Result<bool>;

    /// Reads a field of the hash stored at `key`.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<StoredValue>>;

    /// Reads all fields of the hash stored at `key`.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, StoredValue>>;

    /// Deletes a field of the hash stored at `key`.
    ///
    /// Returns true if the field existed.
    async fn hdel(&self, key: &str, field: &str) -> Result<bool>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// Matches `key` against a Redis-style glob pattern.
///
/// Supports `*` (any run of characters), `?` (exactly one character) and
/// `\` escapes. Character classes are not supported.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, k));
                p += 1;
            }
            Some('?') => {
                p += 1;
                k += 1;
            }
            Some('\\') if p + 1 < pattern.len() && pattern[p + 1] == key[k] => {
                p += 2;
                k += 1;
            }
            Some(c) if *c != '\\' && *c == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match backtrack {
                Some((star_p, star_k)) => {
                    p = star_p + 1;
                    k = star_k + 1;
                    backtrack = Some((star_p, star_k + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
