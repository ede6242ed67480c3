//! Buffered read-your-writes transaction over a `KeyValueStore`.

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use std::collections::BTreeMap;

/// Writes are buffered and only reach the store on [`commit`](Self::commit),
/// as one atomic batch. Dropping an uncommitted transaction discards them.
pub struct StoreTransaction<'a> {
    store: &'a dyn KeyValueStore,
    /// `None` marks a buffered delete
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> StoreTransaction<'a> {
    pub fn begin(store: &'a dyn KeyValueStore) -> Self {
        Self {
            store,
            writes: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.clone()),
            None => self.store.get(key),
        }
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.is_some()),
            None => self.store.exists(key),
        }
    }

    /// Store rows merged with buffered writes, in key order.
    pub fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.prefix_scan(prefix)?.into_iter().collect();
        for (key, value) in self.writes.iter().filter(|(k, _)| k.starts_with(prefix)) {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    /// Store rows in `[start, end)` merged with buffered writes, in key order.
    pub fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<ScanResult, KVStoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.range_scan(start, end)?.into_iter().collect();
        let in_range = |k: &Vec<u8>| k.as_slice() >= start && k.as_slice() < end;
        for (key, value) in self.writes.iter().filter(|(k, _)| in_range(k)) {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.writes.insert(key, None);
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    pub fn commit(self) -> Result<(), KVStoreError> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let operations = self
            .writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::put(key, value),
                None => BatchOperation::delete(key),
            })
            .collect();
        self.store.atomic_batch_write(operations)
    }
}
