//! RocksDB-backed node store.
//!
//! Column families:
//! - `nodes`: live document records (bincode, LZ4 compressed)
//! - `paths`: repository path → document id
//! - `versions`: frozen entries, keyed by `master:index` (bincode, LZ4 compressed)
//! - `content`: immutable content blobs (LZ4 compressed)
//! - `meta`: store counters (legacy id sequence)
//!
//! A [`ChangeSet`] becomes one `WriteBatch`, so a commit is all or nothing.

use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamilyDescriptor, DBCompressionType, DBWithThreadMode,
    IteratorMode, Options, SingleThreaded, WriteBatch, WriteOptions,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use vellum_core::{Document, VersionEntry};

use super::{detach, ChangeSet, NodeOp, NodeStore, StoreError};

/// Column family names.
const CF_NODES: &str = "nodes";
const CF_PATHS: &str = "paths";
const CF_VERSIONS: &str = "versions";
const CF_CONTENT: &str = "content";
const CF_META: &str = "meta";

const COLUMN_FAMILIES: &[&str] = &[CF_NODES, CF_PATHS, CF_VERSIONS, CF_CONTENT, CF_META];

const SEQUENCE_KEY: &[u8] = b"sequence";

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database directory path
    pub path: PathBuf,
    /// Block cache size in bytes (default: 128MB)
    pub block_cache_size: usize,
    /// Bloom filter bits per key (default: 10)
    pub bloom_filter_bits: i32,
    /// Fsync every commit (default: false)
    pub sync_writes: bool,
    /// Max open files for RocksDB (default: 512)
    pub max_open_files: i32,
    /// Write buffer size per column family (default: 32MB)
    pub write_buffer_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vellum_data"),
            block_cache_size: 128 * 1024 * 1024,
            bloom_filter_bits: 10,
            sync_writes: false,
            max_open_files: 512,
            write_buffer_size: 32 * 1024 * 1024,
        }
    }
}

impl StoreConfig {
    /// Create config for testing (small caches).
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            bloom_filter_bits: 10,
            sync_writes: false,
            max_open_files: 64,
            write_buffer_size: 4 * 1024 * 1024,
        }
    }

    /// Block cache size in whole megabytes, at least 1.
    pub fn block_cache_mb(&self) -> u64 {
        (self.block_cache_size as u64 / (1024 * 1024)).max(1)
    }
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

pub struct RocksNodeStore {
    db: DBWithThreadMode<SingleThreaded>,
    config: StoreConfig,
    /// Last handed-out legacy id
    sequence: i64,
}

impl RocksNodeStore {
    /// Open the store, creating the database and column families if needed.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_open_files(config.max_open_files);
        db_opts.set_keep_log_file_num(5);
        db_opts.increase_parallelism(num_cpus());

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Self::cf_options(name, &config)))
            .collect();

        let db = DBWithThreadMode::<SingleThreaded>::open_cf_descriptors(
            &db_opts,
            &config.path,
            cf_descriptors,
        )?;

        let sequence = Self::recover_sequence(&db)?;
        log::info!(
            "Opened node store at {} (sequence {sequence})",
            config.path.display()
        );

        Ok(Self {
            db,
            config,
            sequence,
        })
    }

    fn cf_options(name: &str, config: &StoreConfig) -> Options {
        let mut opts = Options::default();

        let mut block_opts = BlockBasedOptions::default();
        let cache = Cache::new_lru_cache(config.block_cache_size);
        block_opts.set_block_cache(&cache);
        block_opts.set_bloom_filter(config.bloom_filter_bits as f64, false);
        block_opts.set_block_size(16 * 1024);
        opts.set_block_based_table_factory(&block_opts);

        opts.set_compression_type(DBCompressionType::Lz4);
        opts.set_write_buffer_size(config.write_buffer_size);

        match name {
            CF_NODES => {
                // Point lookups by id, full scans for listings
                opts.set_max_write_buffer_number(2);
            }
            CF_PATHS => {
                opts.set_max_write_buffer_number(2);
                opts.optimize_for_point_lookup(config.block_cache_mb());
            }
            CF_VERSIONS => {
                // Prefix-scanned by master id
                opts.set_max_write_buffer_number(4);
                opts.set_prefix_extractor(rocksdb::SliceTransform::create_fixed_prefix(16));
            }
            CF_CONTENT => {
                // Values are already LZ4 compressed
                opts.set_max_write_buffer_number(2);
                opts.set_compression_type(DBCompressionType::None);
            }
            _ => {}
        }

        opts
    }

    fn recover_sequence(db: &DBWithThreadMode<SingleThreaded>) -> Result<i64, StoreError> {
        let cf = db
            .cf_handle(CF_META)
            .ok_or_else(|| StoreError::DatabaseError(format!("Column family '{CF_META}' not found")))?;
        match db.get_cf(&cf, SEQUENCE_KEY)? {
            Some(bytes) if bytes.len() == 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes);
                Ok(i64::from_be_bytes(buf))
            }
            Some(_) => Err(StoreError::DeserializationError("Invalid sequence value".into())),
            None => Ok(0),
        }
    }

    /// Flush memtables to disk.
    pub fn sync(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    // ─── Helpers ──────────────────────────────────────────────────────

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::DatabaseError(format!("Column family '{name}' not found")))
    }

    /// Version key: master id (16 bytes) + index (4 bytes big-endian).
    fn version_key(master_id: Uuid, version_index: u32) -> Vec<u8> {
        let mut key = Vec::with_capacity(20);
        key.extend_from_slice(master_id.as_bytes());
        key.extend_from_slice(&version_index.to_be_bytes());
        key
    }

    /// Current path of a record, looking at this batch first.
    fn current_path(
        &self,
        id: Uuid,
        pending: &HashMap<Uuid, Option<String>>,
    ) -> Result<Option<String>, StoreError> {
        if let Some(path) = pending.get(&id) {
            return Ok(path.clone());
        }
        Ok(self.load_node(id)?.map(|doc| doc.state().path()))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| StoreError::SerializationError(e.to_string()))?;
    Ok(lz4_flex::compress_prepend_size(&bytes))
}

fn decode<T: DeserializeOwned>(compressed: &[u8]) -> Result<T, StoreError> {
    let bytes = lz4_flex::decompress_size_prepended(compressed)
        .map_err(|e| StoreError::CompressionError(e.to_string()))?;
    let (value, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
        .map_err(|e| StoreError::DeserializationError(e.to_string()))?;
    Ok(value)
}

fn uuid_from(bytes: &[u8]) -> Result<Uuid, StoreError> {
    let raw: [u8; 16] = bytes
        .try_into()
        .map_err(|_| StoreError::DeserializationError("Invalid UUID key".into()))?;
    Ok(Uuid::from_bytes(raw))
}

impl NodeStore for RocksNodeStore {
    fn load_node(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        let cf = self.cf(CF_NODES)?;
        match self.db.get_cf(&cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn resolve_path(&self, path: &str) -> Result<Option<Uuid>, StoreError> {
        let cf = self.cf(CF_PATHS)?;
        match self.db.get_cf(&cf, path.as_bytes())? {
            Some(bytes) => Ok(Some(uuid_from(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_nodes(&self) -> Result<Vec<Document>, StoreError> {
        let cf = self.cf(CF_NODES)?;
        let mut documents = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            documents.push(decode(&value)?);
        }
        Ok(documents)
    }

    fn load_history(&self, master_id: Uuid) -> Result<Vec<VersionEntry>, StoreError> {
        let cf = self.cf(CF_VERSIONS)?;
        let start_key = Self::version_key(master_id, 0);

        let mut entries = Vec::new();
        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(&start_key, rocksdb::Direction::Forward),
        );
        for item in iter {
            let (key, value) = item?;
            // Stop once past this master's prefix
            if key.len() != 20 || &key[..16] != master_id.as_bytes() {
                break;
            }
            entries.push(decode(&value)?);
        }
        Ok(entries)
    }

    fn read_blob(&self, blob_id: Uuid) -> Result<Option<Vec<u8>>, StoreError> {
        let cf = self.cf(CF_CONTENT)?;
        match self.db.get_cf(&cf, blob_id.as_bytes())? {
            Some(compressed) => lz4_flex::decompress_size_prepended(&compressed)
                .map(Some)
                .map_err(|e| StoreError::CompressionError(e.to_string())),
            None => Ok(None),
        }
    }

    fn next_sequence(&mut self) -> Result<i64, StoreError> {
        let cf = self.cf(CF_META)?;
        let next = self.sequence + 1;
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db
            .put_cf_opt(&cf, SEQUENCE_KEY, next.to_be_bytes(), &write_opts)?;
        self.sequence = next;
        Ok(next)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<(), StoreError> {
        let cf_nodes = self.cf(CF_NODES)?;
        let cf_paths = self.cf(CF_PATHS)?;
        let cf_versions = self.cf(CF_VERSIONS)?;
        let cf_content = self.cf(CF_CONTENT)?;

        let mut batch = WriteBatch::default();
        let mut pending: HashMap<Uuid, Option<String>> = HashMap::new();

        for op in changes.into_ops() {
            match op {
                NodeOp::PutNode(document) => {
                    let document = detach(*document);
                    let id = document.id();
                    let path = document.state().path();
                    if let Some(old) = self.current_path(id, &pending)? {
                        if old != path {
                            batch.delete_cf(&cf_paths, old.as_bytes());
                        }
                    }
                    batch.put_cf(&cf_nodes, id.as_bytes(), encode(&document)?);
                    batch.put_cf(&cf_paths, path.as_bytes(), id.as_bytes());
                    pending.insert(id, Some(path));
                }
                NodeOp::RemoveNode(id) => {
                    if let Some(old) = self.current_path(id, &pending)? {
                        batch.delete_cf(&cf_paths, old.as_bytes());
                    }
                    batch.delete_cf(&cf_nodes, id.as_bytes());
                    pending.insert(id, None);
                }
                NodeOp::AppendVersion(entry) => {
                    let key = Self::version_key(entry.master_id, entry.version_index);
                    batch.put_cf(&cf_versions, key, encode(&*entry)?);
                }
                NodeOp::DropHistory(master_id) => {
                    let start = Self::version_key(master_id, 0);
                    let mut end = Self::version_key(master_id, u32::MAX);
                    end.push(0xff);
                    batch.delete_range_cf(&cf_versions, start, end);
                }
                NodeOp::PutBlob(blob_id, bytes) => {
                    batch.put_cf(
                        &cf_content,
                        blob_id.as_bytes(),
                        lz4_flex::compress_prepend_size(&bytes),
                    );
                }
                NodeOp::DropBlob(blob_id) => {
                    batch.delete_cf(&cf_content, blob_id.as_bytes());
                }
            }
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db.write_opt(batch, &write_opts)?;
        Ok(())
    }
}

/// Get number of CPU cores for RocksDB parallelism.
fn num_cpus() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(4)
}
