//! Thread-Safe Storage Engine with Expiry Support
//!
//! This module implements the core storage engine for mapkv.
//! It keeps typed values (scalar, list, dictionary) in a HashMap and tracks
//! per-key deadlines in a second HashMap.
//!
//! ## Design Decisions
//!
//! 1. **One Consistency Domain**: Both tables sit behind a single `RwLock`, so a
//!    value and its deadline are always observed together.
//! 2. **Lazy + Active Expiry**: Reads treat a key whose deadline has passed as
//!    absent; the janitor later removes it for real.
//! 3. **Exclusive Sweeps**: The sweep mutates both tables and therefore always
//!    holds the write lock.
//! 4. **Wholesale Replacement**: Values are only ever replaced as a whole by a
//!    put call, never partially mutated.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                   Storage                    │
//! │  ┌────────────────────────────────────────┐  │
//! │  │               RwLock                   │  │
//! │  │  ┌───────────────┐  ┌───────────────┐  │  │
//! │  │  │    entries    │  │   deadlines   │  │  │
//! │  │  │ key -> Value  │  │ key -> Instant│  │  │
//! │  │  └───────────────┘  └───────────────┘  │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Readers share the lock; puts, removals, expiry changes and sweeps take it
//! exclusively.

use crate::storage::clock::{Clock, MonotonicClock};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::janitor::{Janitor, JanitorConfig};
use crate::storage::value::{Dictionary, PutOutcome, Shape, Value, ValueType};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::trace;

/// The primary table and the deadline table.
#[derive(Debug, Default)]
struct Tables {
    entries: HashMap<String, Value>,
    deadlines: HashMap<String, Instant>,
}

impl Tables {
    #[inline]
    fn is_expired(&self, key: &str, now: Instant) -> bool {
        self.deadlines
            .get(key)
            .map(|deadline| now >= *deadline)
            .unwrap_or(false)
    }

    /// Looks up a value, hiding it once its deadline has passed.
    fn live(&self, key: &str, now: Instant) -> Option<&Value> {
        if self.is_expired(key, now) {
            return None;
        }
        self.entries.get(key)
    }

    /// Drops a key whose deadline has passed from both tables, as a sweep
    /// would. Returns true if a stored entry was removed.
    fn reap_if_expired(&mut self, key: &str, now: Instant) -> bool {
        if !self.is_expired(key, now) {
            return false;
        }
        self.deadlines.remove(key);
        let reaped = self.entries.remove(key).is_some();
        trace!(key = %key, reaped, "Reclaimed expired key in place");
        reaped
    }
}

/// The main storage engine for mapkv.
///
/// # Thread Safety
///
/// This struct is designed to be wrapped in an `Arc` and shared between the
/// request layer and the [`Janitor`]. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use mapkv::storage::{Storage, Value};
///
/// let storage = Storage::new();
///
/// storage.put_scalar("name", "Ariz");
/// assert_eq!(storage.get("name"), Ok(Value::from("Ariz")));
///
/// storage.put_list("queue", vec!["a".to_string(), "b".to_string()]);
/// assert_eq!(storage.get_list_element("queue", 1), Ok("b".to_string()));
///
/// // Expire after one minute
/// storage.set_expiry("name", 60_000);
/// ```
pub struct Storage {
    tables: RwLock<Tables>,

    /// Source of "now" for deadlines
    clock: Arc<dyn Clock>,

    /// Statistics: total read operations
    get_count: AtomicU64,

    /// Statistics: total put operations
    put_count: AtomicU64,

    /// Statistics: total remove operations
    remove_count: AtomicU64,

    /// Statistics: number of expired keys reclaimed
    expired_count: AtomicU64,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.read();
        f.debug_struct("Storage")
            .field("entries", &tables.entries.len())
            .field("deadlines", &tables.deadlines.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("put_count", &self.put_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    /// Creates an empty store on the real clock. No janitor is started.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock))
    }

    /// Creates an empty store that reads time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
            get_count: AtomicU64::new(0),
            put_count: AtomicU64::new(0),
            remove_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Creates a store pre-populated with a fixed set of entries, without a
    /// janitor. Used by the request layer's tests.
    pub fn with_fixtures() -> Self {
        let storage = Self::new();
        {
            let mut tables = storage.write();
            let entries = &mut tables.entries;
            entries.insert("keyForStr1".to_string(), Value::from("ValueString_1"));
            entries.insert("keyForStr2".to_string(), Value::from("ValueString_2"));
            entries.insert(
                "keyForList".to_string(),
                Value::List(vec!["new_string_1".to_string(), "new_string_2".to_string()]),
            );
            entries.insert(
                "keyForDict".to_string(),
                Value::Dictionary(Dictionary::from([
                    ("key_one".to_string(), "value_one".to_string()),
                    ("key_two".to_string(), "value_two".to_string()),
                ])),
            );
        }
        storage
    }

    /// Creates an empty store and starts its janitor with the default interval.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use = "dropping the Janitor stops background expiry"]
    pub fn open() -> (Arc<Self>, Janitor) {
        Self::open_with(JanitorConfig::default())
    }

    /// Creates an empty store and starts its janitor with `config`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use = "dropping the Janitor stops background expiry"]
    pub fn open_with(config: JanitorConfig) -> (Arc<Self>, Janitor) {
        let storage = Arc::new(Self::new());
        let janitor = Janitor::start(&storage, config);
        (storage, janitor)
    }

    // A panic can never leave the tables half-updated, so a poisoned lock
    // still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the live value at `key` under the read lock.
    fn with_value<R>(
        &self,
        key: &str,
        f: impl FnOnce(&Value) -> StorageResult<R>,
    ) -> StorageResult<R> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let tables = self.read();
        let now = self.clock.now();
        match tables.live(key, now) {
            Some(value) => f(value),
            None => Err(StorageError::not_found(key)),
        }
    }

    /// Returns all live keys, sorted lexicographically.
    pub fn list_keys(&self) -> Vec<String> {
        let tables = self.read();
        let now = self.clock.now();

        let mut keys: Vec<String> = tables
            .entries
            .keys()
            .filter(|key| !tables.is_expired(key, now))
            .cloned()
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Gets the value for a key, whatever its shape.
    pub fn get(&self, key: &str) -> StorageResult<Value> {
        self.with_value(key, |value| Ok(value.clone()))
    }

    pub fn get_scalar(&self, key: &str) -> StorageResult<String> {
        self.with_value(key, |value| typed::<String>(key, value))
    }

    pub fn get_list(&self, key: &str) -> StorageResult<Vec<String>> {
        self.with_value(key, |value| typed::<Vec<String>>(key, value))
    }

    pub fn get_dictionary(&self, key: &str) -> StorageResult<Dictionary> {
        self.with_value(key, |value| typed::<Dictionary>(key, value))
    }

    /// Returns the element at `index` of the list stored at `key`.
    ///
    /// Negative indices are out of range; they do not count from the end and
    /// are rejected before the key is looked up.
    pub fn get_list_element(&self, key: &str, index: i64) -> StorageResult<String> {
        let Ok(position) = usize::try_from(index) else {
            self.get_count.fetch_add(1, Ordering::Relaxed);
            return Err(StorageError::IndexOutOfRange {
                key: key.to_string(),
                index,
                len: None,
            });
        };

        self.with_value(key, |value| {
            let list = value
                .as_list()
                .ok_or_else(|| mismatch(key, ValueType::List, value))?;

            list.get(position)
                .cloned()
                .ok_or_else(|| StorageError::IndexOutOfRange {
                    key: key.to_string(),
                    index,
                    len: Some(list.len()),
                })
        })
    }

    /// Returns the value mapped from `field` in the dictionary stored at `key`.
    pub fn get_dictionary_element(&self, key: &str, field: &str) -> StorageResult<String> {
        self.with_value(key, |value| {
            let dict = value
                .as_dictionary()
                .ok_or_else(|| mismatch(key, ValueType::Dictionary, value))?;

            dict.get(field)
                .cloned()
                .ok_or_else(|| StorageError::NestedNotFound {
                    key: key.to_string(),
                    field: field.to_string(),
                })
        })
    }

    /// Returns which shape of value is stored at `key`.
    pub fn get_type(&self, key: &str) -> StorageResult<ValueType> {
        self.with_value(key, |value| Ok(value.value_type()))
    }

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &str) -> bool {
        let tables = self.read();
        tables.live(key, self.clock.now()).is_some()
    }

    /// Stores a scalar, replacing whatever was at `key`.
    pub fn put_scalar(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> PutOutcome<String> {
        self.put(key.into(), value.into())
    }

    /// Stores a list, replacing whatever was at `key`.
    pub fn put_list(
        &self,
        key: impl Into<String>,
        value: Vec<String>,
    ) -> PutOutcome<Vec<String>> {
        self.put(key.into(), value)
    }

    /// Stores a dictionary, replacing whatever was at `key`.
    pub fn put_dictionary(
        &self,
        key: impl Into<String>,
        value: Dictionary,
    ) -> PutOutcome<Dictionary> {
        self.put(key.into(), value)
    }

    fn put<T: Shape>(&self, key: String, value: T) -> PutOutcome<T> {
        self.put_count.fetch_add(1, Ordering::Relaxed);

        let mut tables = self.write();
        let now = self.clock.now();

        // An entry past its deadline is already gone as far as callers can
        // tell; the new value must not inherit that deadline.
        if tables.reap_if_expired(&key, now) {
            self.expired_count.fetch_add(1, Ordering::Relaxed);
        }

        let previous = tables.entries.insert(key, value.into_value());
        PutOutcome::from_previous(previous)
    }

    /// Deletes a key. Removing an absent key is not an error.
    ///
    /// Any pending deadline recorded for the key is left for the next sweep.
    ///
    /// # Returns
    ///
    /// Returns `true` if a live entry was removed. A key already past its
    /// deadline is reclaimed as expired and reports `false`.
    pub fn remove(&self, key: &str) -> bool {
        self.remove_count.fetch_add(1, Ordering::Relaxed);

        let mut tables = self.write();
        let now = self.clock.now();

        if tables.reap_if_expired(key, now) {
            self.expired_count.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        tables.entries.remove(key).is_some()
    }

    /// Sets the key to expire `ttl_ms` milliseconds from now.
    ///
    /// A TTL of zero means "no expiration" and leaves any existing deadline
    /// untouched. The key does not need to exist yet. A key already past its
    /// deadline is reclaimed first, so a new deadline never revives it.
    pub fn set_expiry(&self, key: impl Into<String>, ttl_ms: u64) {
        if ttl_ms == 0 {
            return;
        }

        let key = key.into();
        let mut tables = self.write();
        let now = self.clock.now();

        if tables.reap_if_expired(&key, now) {
            self.expired_count.fetch_add(1, Ordering::Relaxed);
        }

        match now.checked_add(Duration::from_millis(ttl_ms)) {
            Some(deadline) => {
                trace!(key = %key, ttl_ms, "Deadline set");
                tables.deadlines.insert(key, deadline);
            }
            None => {
                // Beyond the clock's range: effectively never expires.
                trace!(key = %key, ttl_ms, "Deadline out of range, key made persistent");
                tables.deadlines.remove(&key);
            }
        }
    }

    /// Removes the deadline from a key.
    ///
    /// # Returns
    ///
    /// Returns `true` if a pending deadline was removed.
    pub fn persist(&self, key: &str) -> bool {
        let mut tables = self.write();
        let now = self.clock.now();

        if tables.is_expired(key, now) {
            return false;
        }
        tables.deadlines.remove(key).is_some()
    }

    /// Gets the remaining time before `key` expires.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(remaining))` if the key exists and has a deadline
    /// - `Ok(None)` if the key exists without a deadline
    /// - `Err(NotFound)` if the key doesn't exist
    pub fn ttl(&self, key: &str) -> StorageResult<Option<Duration>> {
        let tables = self.read();
        let now = self.clock.now();

        if tables.live(key, now).is_none() {
            return Err(StorageError::not_found(key));
        }
        Ok(tables
            .deadlines
            .get(key)
            .map(|deadline| deadline.saturating_duration_since(now)))
    }

    /// Removes every key whose deadline has passed from both tables.
    ///
    /// This is called by the janitor. It holds the write lock for the whole
    /// scan, so it is bounded by the size of the deadline table.
    ///
    /// # Returns
    ///
    /// Returns the number of entries that were removed.
    pub fn sweep_expired(&self) -> u64 {
        let mut tables = self.write();
        let now = self.clock.now();

        let Tables { entries, deadlines } = &mut *tables;
        let mut removed = 0u64;

        deadlines.retain(|key, deadline| {
            if now < *deadline {
                return true;
            }
            if entries.remove(key).is_some() {
                trace!(key = %key, "Expired key removed");
                removed += 1;
            }
            false
        });

        if removed > 0 {
            self.expired_count.fetch_add(removed, Ordering::Relaxed);
        }

        removed
    }

    /// Clears both tables.
    pub fn flush(&self) {
        let mut tables = self.write();
        tables.entries.clear();
        tables.deadlines.clear();
    }

    /// Returns the number of stored entries.
    ///
    /// This counts entries whose deadline has passed but which have not been
    /// swept yet.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns storage statistics.
    pub fn stats(&self) -> StorageStats {
        let tables = self.read();
        StorageStats {
            keys: tables.entries.len(),
            deadlines: tables.deadlines.len(),
            get_ops: self.get_count.load(Ordering::Relaxed),
            put_ops: self.put_count.load(Ordering::Relaxed),
            remove_ops: self.remove_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

fn mismatch(key: &str, expected: ValueType, found: &Value) -> StorageError {
    StorageError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.value_type(),
    }
}

/// Clones the payload out of `value` if it has shape `T`.
fn typed<T: Shape>(key: &str, value: &Value) -> StorageResult<T> {
    T::from_value(value.clone()).map_err(|other| mismatch(key, T::TYPE, &other))
}

/// Storage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of entries currently stored
    pub keys: usize,
    /// Number of recorded deadlines
    pub deadlines: usize,
    /// Total read operations
    pub get_ops: u64,
    /// Total put operations
    pub put_ops: u64,
    /// Total remove operations
    pub remove_ops: u64,
    /// Total expired keys reclaimed
    pub expired: u64,
}
