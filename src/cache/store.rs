use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::time::Instant;

use super::CacheMiss;

/// One cached value, threaded into the recency list through the keys of its
/// neighbours
#[derive(Debug)]
struct Entry<K, V> {
    value: V,
    expires_at: Instant,
    /// Towards the least recently used end
    next: Option<K>,
    /// Towards the most recently used end
    previous: Option<K>,
}

/// Map plus recency list. Not synchronized; `ResultCache` serializes access.
///
/// `head` is the most recently used key and `tail` the least recently used.
#[derive(Debug)]
pub(super) struct Store<K, V> {
    items: HashMap<K, Entry<K, V>>,
    head: Option<K>,
    tail: Option<K>,
    capacity: NonZeroUsize,
    ttl: Duration,
}

impl<K, V> Store<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub(super) fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            items: HashMap::with_capacity(capacity.get()),
            head: None,
            tail: None,
            capacity,
            ttl,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.items.len()
    }

    /// Upserts `key`, restarts its TTL and marks it most recently used.
    /// Returns the key evicted to stay within capacity, if any.
    pub(super) fn set(&mut self, key: K, value: V, now: Instant) -> Option<K> {
        let expires_at = now + self.ttl;
        if self.items.contains_key(&key) {
            self.unlink(&key);
            if let Some(entry) = self.items.get_mut(&key) {
                entry.value = value;
                entry.expires_at = expires_at;
            }
        } else {
            self.items.insert(
                key.clone(),
                Entry {
                    value,
                    expires_at,
                    next: None,
                    previous: None,
                },
            );
        }
        self.push_front(key);

        if self.items.len() <= self.capacity.get() {
            return None;
        }
        let evicted = self.tail.clone()?;
        self.remove(&evicted);
        Some(evicted)
    }

    /// Returns a live value and marks it most recently used. An expired
    /// entry is dropped on the spot.
    pub(super) fn get(&mut self, key: &K, now: Instant) -> Result<V, CacheMiss> {
        let expired = match self.items.get(key) {
            None => return Err(CacheMiss::NotFound),
            Some(entry) => now >= entry.expires_at,
        };
        if expired {
            self.remove(key);
            return Err(CacheMiss::Expired);
        }

        self.unlink(key);
        self.push_front(key.clone());
        self.items
            .get(key)
            .map(|entry| entry.value.clone())
            .ok_or(CacheMiss::NotFound)
    }

    pub(super) fn remove(&mut self, key: &K) -> Option<V> {
        if !self.items.contains_key(key) {
            return None;
        }
        self.unlink(key);
        self.items.remove(key).map(|entry| entry.value)
    }

    /// Drops every entry past its expiration, wherever it sits in the list
    pub(super) fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<K> = self
            .items
            .iter()
            .filter(|(_, entry)| now >= entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    /// Detaches `key` from the recency list, leaving it in the map
    fn unlink(&mut self, key: &K) {
        let Some((previous, next)) = self
            .items
            .get_mut(key)
            .map(|entry| (entry.previous.take(), entry.next.take()))
        else {
            return;
        };

        match &previous {
            Some(previous_key) => {
                if let Some(entry) = self.items.get_mut(previous_key) {
                    entry.next = next.clone();
                }
            }
            None => self.head = next.clone(),
        }
        match &next {
            Some(next_key) => {
                if let Some(entry) = self.items.get_mut(next_key) {
                    entry.previous = previous;
                }
            }
            None => self.tail = previous,
        }
    }

    /// Links an already inserted, detached `key` in as the new head
    fn push_front(&mut self, key: K) {
        let old_head = self.head.replace(key.clone());
        if let Some(old_head_key) = &old_head
            && let Some(entry) = self.items.get_mut(old_head_key)
        {
            entry.previous = Some(key.clone());
        }
        if let Some(entry) = self.items.get_mut(&key) {
            entry.previous = None;
            entry.next = old_head;
        }
        if self.tail.is_none() {
            self.tail = Some(key);
        }
    }

    /// Keys from most to least recently used
    #[cfg(test)]
    pub(super) fn recency_order(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.items.len());
        let mut cursor = self.head.clone();
        while let Some(key) = cursor {
            cursor = self.items[&key].next.clone();
            keys.push(key);
        }
        keys
    }

    /// Walks the list both ways and checks it covers exactly the map
    #[cfg(test)]
    pub(super) fn assert_consistent(&self)
    where
        K: std::fmt::Debug,
    {
        let forward = self.recency_order();

        let mut backward = Vec::with_capacity(self.items.len());
        let mut cursor = self.tail.clone();
        while let Some(key) = cursor {
            cursor = self.items[&key].previous.clone();
            backward.push(key);
        }
        backward.reverse();

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), self.items.len());
        assert!(forward.iter().all(|key| self.items.contains_key(key)));
        assert!(self.items.len() <= self.capacity.get());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const TTL: Duration = Duration::from_secs(10);

    fn store(capacity: usize) -> Store<&'static str, u32> {
        Store::new(NonZeroUsize::new(capacity).unwrap(), TTL)
    }

    #[test]
    fn test_set_never_exceeds_capacity() {
        let mut store = store(3);
        let now = Instant::now();
        let keys = ["a", "b", "c", "d", "e", "f", "g"];

        for (i, key) in keys.iter().enumerate() {
            store.set(*key, i as u32, now);
            store.assert_consistent();
            assert!(store.len() <= 3);
        }
        assert_eq!(store.recency_order(), vec!["g", "f", "e"]);
    }

    #[test]
    fn test_overflow_evicts_least_recently_used() {
        let mut store = store(3);
        let now = Instant::now();

        store.set("a", 1, now);
        store.set("b", 2, now);
        store.set("c", 3, now);
        // Touching "a" makes "b" the oldest
        assert_eq!(store.get(&"a", now), Ok(1));

        let evicted = store.set("d", 4, now);
        assert_eq!(evicted, Some("b"));
        assert_eq!(store.get(&"b", now), Err(CacheMiss::NotFound));
        assert_eq!(store.recency_order(), vec!["d", "a", "c"]);
        store.assert_consistent();
    }

    #[test]
    fn test_update_refreshes_recency_without_growing() {
        let mut store = store(2);
        let now = Instant::now();

        store.set("a", 1, now);
        store.set("b", 2, now);
        assert_eq!(store.set("a", 10, now), None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.recency_order(), vec!["a", "b"]);

        assert_eq!(store.set("c", 3, now), Some("b"));
        assert_eq!(store.get(&"a", now), Ok(10));
        store.assert_consistent();
    }

    #[test]
    fn test_expired_entry_is_dropped_on_get() {
        let mut store = store(3);
        let start = Instant::now();

        store.set("a", 1, start);
        store.set("b", 2, start + Duration::from_secs(5));

        let later = start + TTL;
        assert_eq!(store.get(&"a", later), Err(CacheMiss::Expired));
        assert_eq!(store.get(&"a", later), Err(CacheMiss::NotFound));
        assert_eq!(store.get(&"b", later), Ok(2));
        assert_eq!(store.recency_order(), vec!["b"]);
        store.assert_consistent();
    }

    #[test]
    fn test_set_restarts_ttl() {
        let mut store = store(3);
        let start = Instant::now();

        store.set("a", 1, start);
        store.set("a", 2, start + Duration::from_secs(8));

        assert_eq!(store.get(&"a", start + Duration::from_secs(12)), Ok(2));
    }

    #[test]
    fn test_purge_expired_ignores_recency() {
        let mut store = store(4);
        let start = Instant::now();

        store.set("old", 1, start);
        store.set("mid", 2, start + Duration::from_secs(3));
        store.set("new", 3, start + Duration::from_secs(6));
        // "old" is now the most recently used but still expires first
        assert_eq!(store.get(&"old", start + Duration::from_secs(7)), Ok(1));

        let removed = store.purge_expired(start + Duration::from_secs(14));
        assert_eq!(removed, 2);
        assert_eq!(store.recency_order(), vec!["new"]);
        store.assert_consistent();
    }

    #[test]
    fn test_remove_middle_head_and_tail() {
        let mut store = store(5);
        let now = Instant::now();
        for (i, key) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            store.set(*key, i as u32, now);
        }

        assert_eq!(store.remove(&"c"), Some(2));
        store.assert_consistent();
        assert_eq!(store.remove(&"e"), Some(4));
        store.assert_consistent();
        assert_eq!(store.remove(&"a"), Some(0));
        store.assert_consistent();
        assert_eq!(store.remove(&"a"), None);

        assert_eq!(store.recency_order(), vec!["d", "b"]);
    }

    #[test]
    fn test_capacity_one_keeps_latest() {
        let mut store = store(1);
        let now = Instant::now();

        assert_eq!(store.set("a", 1, now), None);
        assert_eq!(store.set("b", 2, now), Some("a"));
        assert_eq!(store.get(&"b", now), Ok(2));
        store.assert_consistent();
    }
}
