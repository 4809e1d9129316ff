//! In-memory ordered key-value store.
//!
//! Backs the graph adapter in tests and in embedded single-process use.
//! A `BTreeMap` gives the ordered prefix scans the read contract needs;
//! durability is explicitly not this type's problem.

use std::collections::BTreeMap;

use helixql_api::{KvStore, KvWrite};

#[derive(Debug, Default)]
pub struct MemStore {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.map.get(key).cloned()
    }

    fn scan<'a>(&'a self, prefix: &[u8]) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let prefix = prefix.to_vec();
        Box::new(
            self.map
                .range(prefix.clone()..)
                .take_while(move |(key, _)| key.starts_with(&prefix))
                .map(|(key, value)| (key.clone(), value.clone())),
        )
    }
}

impl KvWrite for MemStore {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.map.insert(key, value);
    }

    fn delete(&mut self, key: &[u8]) -> bool {
        self.map.remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_returns_only_prefixed_keys_in_order() {
        let mut store = MemStore::new();
        store.put(b"a:1".to_vec(), b"v1".to_vec());
        store.put(b"a:2".to_vec(), b"v2".to_vec());
        store.put(b"ab:1".to_vec(), b"v3".to_vec());
        store.put(b"b:1".to_vec(), b"v4".to_vec());

        let hits: Vec<_> = store.scan(b"a:").map(|(k, _)| k).collect();
        assert_eq!(hits, vec![b"a:1".to_vec(), b"a:2".to_vec()]);
    }

    #[test]
    fn scan_with_unmatched_prefix_is_empty() {
        let mut store = MemStore::new();
        store.put(b"n:x".to_vec(), b"v".to_vec());
        assert_eq!(store.scan(b"e:").count(), 0);
    }

    #[test]
    fn delete_reports_presence() {
        let mut store = MemStore::new();
        store.put(b"k".to_vec(), b"v".to_vec());
        assert!(store.delete(b"k"));
        assert!(!store.delete(b"k"));
        assert_eq!(store.get(b"k"), None);
    }
}
