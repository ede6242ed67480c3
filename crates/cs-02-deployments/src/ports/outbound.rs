//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the engine requires the host application to provide.

use crate::domain::entities::{ContentHash, EntityId, EntityType, Pointer, Timestamp};
use crate::domain::errors::{DeploymentError, KVStoreError};
use crate::domain::value_objects::{DeploymentDelta, PointerState};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Abstract interface for key-value database operations.
///
/// Every method takes `&self`: one store is shared by all admission-queue
/// slots, so implementations synchronize internally.
///
/// Production: `RocksDbStore` (feature `rocksdb`)
/// Testing: `InMemoryKVStore`
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key.
    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError>;

    /// All pairs whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError>;

    /// All pairs with `start <= key < end`, in ascending key order.
    fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<ScanResult, KVStoreError>;
}

/// Key-value pairs returned by a prefix scan.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// Wall clock used to stamp `local_timestamp` and GC watermarks.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> Timestamp;
}

/// Content blob store. Only deletion is needed by this crate.
#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Delete blobs by hash. Unknown hashes are ignored.
    async fn delete(&self, hashes: &[ContentHash]) -> Result<(), DeploymentError>;
}

/// Read-path cache of the active entity per (type, pointer).
///
/// `Some(None)` is a cached "nothing active"; `None` is a miss.
///
/// Invalidation contract: after every committed deployment, `apply_delta`
/// rewrites exactly the pointers present in that deployment's delta. The
/// cache is never flushed wholesale.
pub trait ActiveEntitiesCache: Send + Sync {
    fn get(&self, entity_type: EntityType, pointer: &str) -> Option<Option<EntityId>>;

    /// Insert unless an entry exists. Readers populate through this so a
    /// value read before a concurrent commit cannot replace the commit's delta.
    fn populate(&self, entity_type: EntityType, pointer: &str, entity_id: Option<EntityId>);

    /// Unconditional write.
    fn put(&self, entity_type: EntityType, pointer: &str, entity_id: Option<EntityId>);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply one committed deployment's delta.
    fn apply_delta(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        deltas: &BTreeMap<Pointer, DeploymentDelta>,
    ) {
        for (pointer, delta) in deltas {
            let active = match delta.after {
                PointerState::Set => Some(entity_id.to_string()),
                PointerState::Cleared => None,
            };
            self.put(entity_type, pointer, active);
        }
    }
}
