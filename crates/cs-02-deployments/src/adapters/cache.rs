use crate::domain::entities::{EntityId, EntityType, Pointer};
use crate::ports::outbound::ActiveEntitiesCache;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(150_000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Bounded LRU of the active entity per (type, pointer).
pub struct LruActiveEntitiesCache {
    entries: Mutex<LruCache<(EntityType, Pointer), Option<EntityId>>>,
}

impl LruActiveEntitiesCache {
    /// A capacity of zero falls back to the default size.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CACHE_SIZE);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl Default for LruActiveEntitiesCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE.get())
    }
}

impl ActiveEntitiesCache for LruActiveEntitiesCache {
    fn get(&self, entity_type: EntityType, pointer: &str) -> Option<Option<EntityId>> {
        self.entries
            .lock()
            .get(&(entity_type, pointer.to_string()))
            .cloned()
    }

    fn populate(&self, entity_type: EntityType, pointer: &str, entity_id: Option<EntityId>) {
        let mut entries = self.entries.lock();
        let key = (entity_type, pointer.to_string());
        if !entries.contains(&key) {
            entries.put(key, entity_id);
        }
    }

    fn put(&self, entity_type: EntityType, pointer: &str, entity_id: Option<EntityId>) {
        self.entries
            .lock()
            .put((entity_type, pointer.to_string()), entity_id);
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
