use crate::KvStore;
use core::convert::Infallible;
use std::collections::BTreeMap;

/// In-memory [`KvStore`] backed by an ordered map.
///
/// The ordered map gives prefix iteration in raw byte order for free, matching
/// the iteration contract of the authenticated store it stands in for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryKv {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryKv {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryKv {
    type Error = Infallible;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error> {
        self.entries.remove(key);
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool, Self::Error> {
        Ok(self.entries.contains_key(key))
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let mut kv = MemoryKv::new();
        assert_eq!(kv.get(b"a").unwrap(), None);

        kv.set(b"a", b"1").unwrap();
        assert_eq!(kv.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(kv.has(b"a").unwrap());

        kv.set(b"a", b"2").unwrap();
        assert_eq!(kv.get(b"a").unwrap(), Some(b"2".to_vec()));

        kv.delete(b"a").unwrap();
        assert_eq!(kv.get(b"a").unwrap(), None);
        assert!(kv.is_empty());
    }

    #[test]
    fn prefix_iteration_is_byte_ordered() {
        let mut kv = MemoryKv::new();
        kv.set(&[1, 3], b"c").unwrap();
        kv.set(&[1, 1], b"a").unwrap();
        kv.set(&[1, 2], b"b").unwrap();
        kv.set(&[2, 0], b"other").unwrap();
        kv.set(&[0, 9], b"other").unwrap();

        let entries = kv.iter_prefix(&[1]).unwrap();
        assert_eq!(
            entries,
            vec![
                (vec![1, 1], b"a".to_vec()),
                (vec![1, 2], b"b".to_vec()),
                (vec![1, 3], b"c".to_vec()),
            ]
        );
    }

    #[test]
    fn prefix_iteration_empty_prefix_scans_everything() {
        let mut kv = MemoryKv::new();
        kv.set(&[2], b"b").unwrap();
        kv.set(&[1], b"a").unwrap();

        let entries = kv.iter_prefix(&[]).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, vec![1]);
        assert_eq!(entries[1].0, vec![2]);
    }
}
