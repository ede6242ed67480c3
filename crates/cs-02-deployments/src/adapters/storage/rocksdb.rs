//! Persistent `KeyValueStore` for production nodes: one `WriteBatch` per
//! deployment commit, Snappy-compressed blocks, bloom-filtered point lookups.

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use rocksdb::{
    BlockBasedOptions, Cache, DBCompressionType, Direction, IteratorMode, Options, WriteBatch,
    WriteOptions, DB,
};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    pub path: String,
    /// Bytes of LRU block cache
    pub block_cache_size: usize,
    /// Bytes buffered in the memtable before a flush
    pub write_buffer_size: usize,
    /// fsync every write batch
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/deployments".to_string(),
            block_cache_size: 128 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Small buffers, no fsync
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

fn io_error(op: &'static str) -> impl FnOnce(rocksdb::Error) -> KVStoreError {
    move |e| KVStoreError::IOError {
        message: format!("RocksDB {} failed: {}", op, e),
    }
}

/// `KeyValueStore` over one RocksDB instance. RocksDB synchronizes
/// internally, so the handle is shared without an outer lock.
pub struct RocksDbStore {
    db: DB,
    sync_writes: bool,
}

impl RocksDbStore {
    /// Open or create the database at `config.path`
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut table = BlockBasedOptions::default();
        // entity and pointer rows are point lookups
        table.set_bloom_filter(10.0, false);
        table.set_block_cache(&Cache::new_lru_cache(config.block_cache_size));

        let mut options = Options::default();
        options.create_if_missing(true);
        options.set_compression_type(DBCompressionType::Snappy);
        options.set_write_buffer_size(config.write_buffer_size);
        options.set_block_based_table_factory(&table);

        let db = DB::open(&options, &config.path).map_err(io_error("open"))?;
        debug!(path = %config.path, sync = config.sync_writes, "RocksDB opened");
        Ok(Self {
            db,
            sync_writes: config.sync_writes,
        })
    }

    fn write_options(&self) -> WriteOptions {
        let mut options = WriteOptions::default();
        options.set_sync(self.sync_writes);
        options
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.db.get(key).map_err(io_error("get"))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(io_error("put"))
    }

    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .delete_opt(key, &self.write_options())
            .map_err(io_error("delete"))
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let batch = operations
            .into_iter()
            .fold(WriteBatch::default(), |mut batch, op| {
                match op {
                    BatchOperation::Put { key, value } => batch.put(key, value),
                    BatchOperation::Delete { key } => batch.delete(key),
                }
                batch
            });
        self.db
            .write_opt(batch, &self.write_options())
            .map_err(io_error("batch write"))
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.db.get_pinned(key).map_err(io_error("exists"))?.is_some())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        let mut rows = Vec::new();
        for item in self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(io_error("scan"))?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.into_vec(), value.into_vec()));
        }
        Ok(rows)
    }

    fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<ScanResult, KVStoreError> {
        let mut rows = Vec::new();
        for item in self
            .db
            .iterator(IteratorMode::From(start, Direction::Forward))
        {
            let (key, value) = item.map_err(io_error("scan"))?;
            if &*key >= end {
                break;
            }
            rows.push((key.into_vec(), value.into_vec()));
        }
        Ok(rows)
    }
}
