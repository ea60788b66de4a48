//! Thread-safe cache of the last known value per group address.
//!
//! Populated by the session's receiver thread whenever a group write or
//! group response arrives, and consulted by `group_read` to avoid a bus
//! round-trip when a fresh-enough value is already known.

use dashmap::DashMap;

use crate::addressing::GroupAddress;

/// Last-known-value cache, keyed by group address
///
/// Each `TunnelSession` owns its own cache instance; unlike the traditional
/// class-level cache, values from one session can never leak into another.
#[derive(Debug, Default)]
pub struct ValueCache {
    values: DashMap<GroupAddress, Vec<u8>>,
}

impl ValueCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self { values: DashMap::new() }
    }

    /// Get the last known value for `addr`, if any
    pub fn get(&self, addr: GroupAddress) -> Option<Vec<u8>> {
        self.values.get(&addr).map(|v| v.clone())
    }

    /// Store `value` for `addr`
    ///
    /// Returns `true` if this changes the previously cached value (or there
    /// was none), `false` if the value is unchanged.
    pub fn set(&self, addr: GroupAddress, value: &[u8]) -> bool {
        match self.values.get(&addr) {
            Some(existing) if existing.as_slice() == value => false,
            _ => {
                self.values.insert(addr, value.to_vec());
                true
            }
        }
    }

    /// Remove all cached values
    pub fn clear(&self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(a: u8, b: u8, c: u8) -> GroupAddress {
        GroupAddress::new(a, b, c).unwrap()
    }

    #[test]
    fn test_get_empty() {
        let cache = ValueCache::new();
        assert_eq!(cache.get(addr(1, 2, 3)), None);
    }

    #[test]
    fn test_set_new_value_reports_changed() {
        let cache = ValueCache::new();
        assert!(cache.set(addr(1, 2, 3), &[0x01]));
        assert_eq!(cache.get(addr(1, 2, 3)), Some(vec![0x01]));
    }

    #[test]
    fn test_set_same_value_reports_unchanged() {
        let cache = ValueCache::new();
        assert!(cache.set(addr(1, 2, 3), &[0x01]));
        assert!(!cache.set(addr(1, 2, 3), &[0x01]));
    }

    #[test]
    fn test_set_different_value_reports_changed() {
        let cache = ValueCache::new();
        assert!(cache.set(addr(1, 2, 3), &[0x01]));
        assert!(cache.set(addr(1, 2, 3), &[0x00]));
        assert_eq!(cache.get(addr(1, 2, 3)), Some(vec![0x00]));
    }

    #[test]
    fn test_clear() {
        let cache = ValueCache::new();
        cache.set(addr(1, 2, 3), &[0x01]);
        cache.clear();
        assert_eq!(cache.get(addr(1, 2, 3)), None);
    }

    #[test]
    fn test_independent_instances_do_not_share_state() {
        // Distinct caches must never see each other's values -- the
        // original Python ValueCache used a class-level dict shared by
        // every instance, which this per-instance DashMap avoids.
        let a = ValueCache::new();
        let b = ValueCache::new();
        a.set(addr(1, 2, 3), &[0x01]);
        assert_eq!(b.get(addr(1, 2, 3)), None);
    }
}
