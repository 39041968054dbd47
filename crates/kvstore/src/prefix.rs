use crate::KvStore;

/// View of a [`KvStore`] confined to a single one-byte namespace.
///
/// Every key passed to this store is transparently prepended with the
/// namespace byte, and iteration strips it back off. Namespaces keep the
/// domain ranges of the state database (accounts, code, storage, logs, ...)
/// disjoint within one backing store.
#[derive(Debug)]
pub struct PrefixStore<'a, S> {
    kv: &'a mut S,
    prefix: u8,
}

impl<'a, S: KvStore> PrefixStore<'a, S> {
    /// Creates a view over `kv` under `prefix`.
    pub fn new(kv: &'a mut S, prefix: u8) -> Self {
        Self { kv, prefix }
    }

    fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + suffix.len());
        key.push(self.prefix);
        key.extend_from_slice(suffix);
        key
    }

    /// Gets the value stored under `suffix` within the namespace.
    pub fn get(&self, suffix: &[u8]) -> Result<Option<Vec<u8>>, S::Error> {
        self.kv.get(&self.key(suffix))
    }

    /// Sets `suffix` to `value` within the namespace.
    pub fn set(&mut self, suffix: &[u8], value: &[u8]) -> Result<(), S::Error> {
        let key = self.key(suffix);
        self.kv.set(&key, value)
    }

    /// Deletes the value stored under `suffix` within the namespace.
    pub fn delete(&mut self, suffix: &[u8]) -> Result<(), S::Error> {
        let key = self.key(suffix);
        self.kv.delete(&key)
    }

    /// Returns whether `suffix` holds a value within the namespace.
    pub fn has(&self, suffix: &[u8]) -> Result<bool, S::Error> {
        self.kv.has(&self.key(suffix))
    }

    /// Returns all entries of the namespace in raw byte order, with the
    /// namespace byte stripped from the keys.
    pub fn iter(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, S::Error> {
        Ok(self
            .kv
            .iter_prefix(&[self.prefix])?
            .into_iter()
            .map(|(key, value)| (key[1..].to_vec(), value))
            .collect())
    }
}
