use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{
    KvError, Result, StoredValue,
    store::{KeyValueStore, Ttl, glob_match},
};

#[derive(Debug, Clone)]
enum Data {
    Text(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    data: Data,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory key-value store for tests and local runs.
///
/// Behaves like a single Redis instance: values are kept as wire text,
/// leases run on the tokio clock (so `tokio::time::pause` controls them) and
/// expired keys are dropped lazily when touched.
///
/// Reads and writes can be made to fail with [`KvError::NotConnected`] to
/// simulate an unreachable store.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    fail_on_read: Arc<AtomicBool>,
    fail_on_write: Arc<AtomicBool>,
}

impl InMemoryKeyValueStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes raw wire text, bypassing the value envelope.
    ///
    /// Simulates a foreign writer or a corrupted record.
    pub async fn set_wire(&self, key: &str, text: impl Into<String>, ttl: Option<Duration>) {
        let entry = Entry {
            data: Data::Text(text.into()),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    /// Returns the number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Returns true if no live key is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes every key.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Makes every subsequent read, scan and ping fail.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.fail_on_read.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent set, delete, expire and hash write fail.
    pub fn set_fail_on_write(&self, fail: bool) {
        self.fail_on_write.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_on_read.load(Ordering::SeqCst) {
            return Err(KvError::NotConnected);
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_on_write.load(Ordering::SeqCst) {
            return Err(KvError::NotConnected);
        }
        Ok(())
    }
}

/// Returns the live entry at `key`, dropping it first if its lease ran out.
fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

fn remaining_secs(expires_at: Instant, now: Instant) -> u64 {
    let remaining = expires_at.saturating_duration_since(now);
    // Redis rounds the millisecond remainder to the nearest second.
    ((remaining.as_millis() + 500) / 1000) as u64
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn set(&self, key: &str, value: StoredValue, ttl: Option<Duration>) -> Result<()> {
        self.check_write()?;
        let wire = value.to_wire()?;
        let entry = Entry {
            data: Data::Text(wire),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        self.check_read()?;
        let mut entries = self.entries.write().await;
        match live_entry(&mut entries, key, Instant::now()) {
            None => Ok(None),
            Some(Entry {
                data: Data::Text(text),
                ..
            }) => StoredValue::from_wire(key, text).map(Some),
            Some(_) => Err(KvError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check_write()?;
        let mut entries = self.entries.write().await;
        let existed = live_entry(&mut entries, key, Instant::now()).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check_read()?;
        let mut entries = self.entries.write().await;
        Ok(live_entry(&mut entries, key, Instant::now()).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.check_write()?;
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let Some(entry) = live_entry(&mut entries, key, now) else {
            return Ok(false);
        };

        if ttl.is_zero() {
            // A zero lease deletes the key immediately.
            entries.remove(key);
        } else {
            entry.expires_at = Some(now + ttl);
        }
        Ok(true)
    }

    async fn ttl(&self, key: &str) -> Result<Ttl> {
        self.check_read()?;
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        Ok(match live_entry(&mut entries, key, now) {
            None => Ttl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => Ttl::Persistent,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => Ttl::Expires(remaining_secs(*at, now)),
        })
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.check_read()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn hset(&self, key: &str, field: &str, value: StoredValue) -> Result<bool> {
        self.check_write()?;
        let wire = value.to_wire()?;
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        if live_entry(&mut entries, key, now).is_none() {
            entries.insert(
                key.to_string(),
                Entry {
                    data: Data::Hash(HashMap::new()),
                    expires_at: None,
                },
            );
        }

        match entries.get_mut(key).map(|entry| &mut entry.data) {
            Some(Data::Hash(fields)) => Ok(fields.insert(field.to_string(), wire).is_none()),
            _ => Err(KvError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<StoredValue>> {
        self.check_read()?;
        let mut entries = self.entries.write().await;
        match live_entry(&mut entries, key, Instant::now()).map(|entry| &entry.data) {
            None => Ok(None),
            Some(Data::Hash(fields)) => fields
                .get(field)
                .map(|text| StoredValue::from_wire(key, text))
                .transpose(),
            Some(Data::Text(_)) => Err(KvError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, StoredValue>> {
        self.check_read()?;
        let mut entries = self.entries.write().await;
        match live_entry(&mut entries, key, Instant::now()).map(|entry| &entry.data) {
            None => Ok(HashMap::new()),
            Some(Data::Hash(fields)) => fields
                .iter()
                .map(|(field, text)| Ok((field.clone(), StoredValue::from_wire(key, text)?)))
                .collect(),
            Some(Data::Text(_)) => Err(KvError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        self.check_write()?;
        let mut entries = self.entries.write().await;
        let removed = match live_entry(&mut entries, key, Instant::now()).map(|e| &mut e.data) {
            None => return Ok(false),
            Some(Data::Hash(fields)) => fields.remove(field).is_some(),
            Some(Data::Text(_)) => {
                return Err(KvError::WrongType {
                    key: key.to_string(),
                });
            }
        };

        // Redis drops a hash once its last field is gone.
        let emptied = matches!(
            entries.get(key),
            Some(Entry { data: Data::Hash(fields), .. }) if fields.is_empty()
        );
        if emptied {
            entries.remove(key);
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        self.check_read()
    }
}
