//! Bounded in-memory cache with per-entry expiry and eviction callbacks.
//!
//! Expired entries are dropped lazily on access and eagerly by
//! [`MemoryCache::purge_expired`]. When the cache is full, expired entries
//! go first, then the oldest insertion. Pinned entries never expire and are
//! never evicted for capacity.
//!
//! Callbacks run after the internal lock is released.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Its expiry passed
    Expired,
    /// Removed by [`MemoryCache::remove`]
    Removed,
    /// Overwritten by [`MemoryCache::insert`]
    Replaced,
    /// Dropped to make room
    Capacity,
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionReason::Expired => write!(f, "expired"),
            EvictionReason::Removed => write!(f, "removed"),
            EvictionReason::Replaced => write!(f, "replaced"),
            EvictionReason::Capacity => write!(f, "capacity"),
        }
    }
}

/// Callback invoked with every evicted entry.
pub type EvictionCallback<K, V> = Arc<dyn Fn(&K, &V, EvictionReason) + Send + Sync>;

struct Slot<V> {
    value: V,
    expires_at: Option<Instant>,
    pinned: bool,
    sequence: u64,
}

impl<V> Slot<V> {
    fn is_expired(&self, now: Instant) -> bool {
        !self.pinned && self.expires_at.is_some_and(|at| at <= now)
    }
}

struct Inner<K, V> {
    slots: HashMap<K, Slot<V>>,
    /// Unpinned keys in insertion order
    by_sequence: BTreeMap<u64, K>,
    /// Keys with an expiry, soonest first
    by_expiry: BTreeMap<(Instant, u64), K>,
    next_sequence: u64,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone,
{
    fn take(&mut self, key: &K) -> Option<Slot<V>> {
        let slot = self.slots.remove(key)?;
        self.by_sequence.remove(&slot.sequence);
        if let Some(at) = slot.expires_at {
            self.by_expiry.remove(&(at, slot.sequence));
        }
        Some(slot)
    }

    fn put(&mut self, key: K, slot: Slot<V>) {
        if !slot.pinned {
            self.by_sequence.insert(slot.sequence, key.clone());
            if let Some(at) = slot.expires_at {
                self.by_expiry.insert((at, slot.sequence), key.clone());
            }
        }
        self.slots.insert(key, slot);
    }

    fn next_expired(&self, now: Instant) -> Option<K> {
        self.by_expiry
            .first_key_value()
            .filter(|((at, _), _)| *at <= now)
            .map(|(_, key)| key.clone())
    }

    fn oldest(&self) -> Option<K> {
        self.by_sequence.first_key_value().map(|(_, key)| key.clone())
    }
}

/// Thread-safe key/value cache.
pub struct MemoryCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    max_entries: usize,
    on_evict: Option<EvictionCallback<K, V>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                slots: HashMap::new(),
                by_sequence: BTreeMap::new(),
                by_expiry: BTreeMap::new(),
                next_sequence: 0,
            }),
            max_entries: max_entries.max(1),
            on_evict: None,
        }
    }

    /// Register the eviction callback.
    pub fn with_eviction_callback(mut self, callback: EvictionCallback<K, V>) -> Self {
        self.on_evict = Some(callback);
        self
    }

    /// Look up a live entry.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let expired = {
            let mut inner = self.inner.lock();
            match inner.slots.get(key) {
                None => return None,
                Some(slot) if !slot.is_expired(now) => return Some(slot.value.clone()),
                Some(_) => {}
            }
            inner.take(key)
        };

        if let Some(slot) = expired {
            self.notify(vec![(key.clone(), slot.value, EvictionReason::Expired)]);
        }
        None
    }

    /// Whether a live entry exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Return the live entry for `key`, inserting `loader()` if there is none.
    ///
    /// Lookup and insertion happen under one lock, so concurrent callers
    /// observe a single entry.
    pub fn get_or_insert_with<F>(&self, key: K, loader: F, expiry: Option<Duration>) -> V
    where
        F: FnOnce() -> V,
    {
        let now = Instant::now();
        let mut evicted = Vec::new();
        let value = {
            let mut inner = self.inner.lock();
            let live = inner
                .slots
                .get(&key)
                .filter(|slot| !slot.is_expired(now))
                .map(|slot| slot.value.clone());
            match live {
                Some(value) => value,
                None => {
                    if let Some(old) = inner.take(&key) {
                        evicted.push((key.clone(), old.value, EvictionReason::Expired));
                    }
                    let value = loader();
                    self.store(&mut inner, key, value.clone(), expiry, false, now, &mut evicted);
                    value
                }
            }
        };
        self.notify(evicted);
        value
    }

    /// Insert or replace an entry.
    pub fn insert(&self, key: K, value: V, expiry: Option<Duration>) {
        self.insert_slot(key, value, expiry, false);
    }

    /// Insert an entry that never expires and is never evicted for capacity.
    pub fn insert_pinned(&self, key: K, value: V) {
        self.insert_slot(key, value, None, true);
    }

    /// Remove an entry, returning its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.inner.lock().take(key)?;
        self.notify(vec![(key.clone(), removed.value.clone(), EvictionReason::Removed)]);
        Some(removed.value)
    }

    /// Drop every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut evicted = Vec::new();
        {
            let mut inner = self.inner.lock();
            while let Some(key) = inner.next_expired(now) {
                if let Some(slot) = inner.take(&key) {
                    evicted.push((key, slot.value, EvictionReason::Expired));
                }
            }
        }
        let count = evicted.len();
        self.notify(evicted);
        count
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_slot(&self, key: K, value: V, expiry: Option<Duration>, pinned: bool) {
        let now = Instant::now();
        let mut evicted = Vec::new();
        {
            let mut inner = self.inner.lock();
            if let Some(old) = inner.take(&key) {
                evicted.push((key.clone(), old.value, EvictionReason::Replaced));
            }
            self.store(&mut inner, key, value, expiry, pinned, now, &mut evicted);
        }
        self.notify(evicted);
    }

    #[allow(clippy::too_many_arguments)]
    fn store(
        &self,
        inner: &mut Inner<K, V>,
        key: K,
        value: V,
        expiry: Option<Duration>,
        pinned: bool,
        now: Instant,
        evicted: &mut Vec<(K, V, EvictionReason)>,
    ) {
        Self::make_room(inner, self.max_entries, now, evicted);

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        let expires_at = if pinned { None } else { expiry.map(|ttl| now + ttl) };
        inner.put(
            key,
            Slot {
                value,
                expires_at,
                pinned,
                sequence,
            },
        );
    }

    /// Evict until one more entry fits: expired entries first, then the
    /// oldest unpinned one.
    fn make_room(
        inner: &mut Inner<K, V>,
        max_entries: usize,
        now: Instant,
        evicted: &mut Vec<(K, V, EvictionReason)>,
    ) {
        while inner.slots.len() >= max_entries {
            let (key, reason) = match inner.next_expired(now) {
                Some(key) => (key, EvictionReason::Expired),
                None => match inner.oldest() {
                    Some(key) => (key, EvictionReason::Capacity),
                    None => break,
                },
            };
            if let Some(slot) = inner.take(&key) {
                evicted.push((key, slot.value, reason));
            }
        }
    }

    fn notify(&self, evicted: Vec<(K, V, EvictionReason)>) {
        if let Some(callback) = &self.on_evict {
            for (key, value, reason) in &evicted {
                callback(key, value, *reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_capacity_evicts_oldest_unpinned() {
        let cache = MemoryCache::new(2);
        cache.insert_pinned("genesis", 0);
        cache.insert("a", 1, None);
        cache.insert("b", 2, None);

        assert_eq!(cache.get(&"genesis"), Some(0));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_prefers_expired_over_oldest() {
        let cache = MemoryCache::new(3);
        cache.insert("old", 1, None);
        cache.insert("short", 2, Some(Duration::from_secs(1)));
        cache.insert("long", 3, Some(Duration::from_secs(60)));
        tokio::time::advance(Duration::from_secs(2)).await;

        cache.insert("new", 4, None);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&"old"), Some(1));
        assert_eq!(cache.get(&"short"), None);

        // Nothing expired any more: the oldest insertion goes
        cache.insert("newer", 5, None);
        assert_eq!(cache.get(&"old"), None);
        assert_eq!(cache.get(&"long"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_drops_only_expired() {
        let cache = MemoryCache::new(usize::MAX);
        for i in 0..100u32 {
            cache.insert(i, i, Some(Duration::from_secs(10)));
        }
        cache.insert(100, 100, Some(Duration::from_secs(30)));
        cache.insert(101, 101, None);
        cache.insert_pinned(102, 102);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.purge_expired(), 100);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.purge_expired(), 0);

        cache.remove(&100);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.get(&102), Some(102));
    }

    #[test]
    fn test_get_or_insert_keeps_first_value() {
        let cache = MemoryCache::new(10);
        assert_eq!(cache.get_or_insert_with("k", || 1, None), 1);
        assert_eq!(cache.get_or_insert_with("k", || 2, None), 1);
    }

    #[test]
    fn test_callback_sees_replace_and_remove() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let cache = MemoryCache::new(10).with_eviction_callback(Arc::new(
            move |_: &&str, _: &u32, reason: EvictionReason| {
                assert!(matches!(reason, EvictionReason::Replaced | EvictionReason::Removed));
                seen.fetch_add(1, Ordering::SeqCst);
            },
        ));

        cache.insert("k", 1, None);
        cache.insert("k", 2, None);
        assert_eq!(cache.remove(&"k"), Some(2));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
