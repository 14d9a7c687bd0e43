use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub trait CacheEntry {
    fn fetched_at(&self) -> Instant;
}

/// Drop entries older than `max_age`, then the oldest ones until at most
/// `max_entries` remain.
pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize, max_age: Duration)
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    let now = Instant::now();
    let mut entries: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().fetched_at()))
        .collect();

    entries.retain(|(key, fetched_at)| {
        let expired = now.duration_since(*fetched_at) > max_age;
        if expired {
            cache.remove(key);
        }
        !expired
    });

    if cache.len() <= max_entries {
        return;
    }

    entries.sort_by_key(|(_, fetched_at)| *fetched_at);
    for (key, _) in entries {
        if cache.len() <= max_entries {
            break;
        }
        cache.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entry(Instant);

    impl CacheEntry for Entry {
        fn fetched_at(&self) -> Instant {
            self.0
        }
    }

    #[test]
    fn keeps_newest_entries_within_capacity() {
        let cache = DashMap::new();
        let now = Instant::now();
        for i in 0..5u64 {
            cache.insert(i, Entry(now - Duration::from_secs(10 - i)));
        }
        prune_cache(&cache, 2, Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains_key(&3));
        assert!(cache.contains_key(&4));
    }

    #[test]
    fn drops_expired_entries() {
        let cache = DashMap::new();
        let now = Instant::now();
        cache.insert("old", Entry(now - Duration::from_secs(120)));
        cache.insert("new", Entry(now));
        prune_cache(&cache, 10, Duration::from_secs(60));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key("new"));
    }
}
