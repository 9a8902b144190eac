//! Backing node store.
//!
//! The repository never writes piecemeal: every mutating operation builds a
//! [`ChangeSet`] and hands it to [`NodeStore::commit`], which applies it
//! atomically.
//!
//! ```text
//! ┌──────────────────┐   ChangeSet    ┌─────────────────────────────────┐
//! │ DocumentRepository│ ─────────────► │ NodeStore                       │
//! └──────────────────┘                │  nodes    id   → live record     │
//!                                     │  paths    path → id              │
//!                                     │  versions master:index → entry   │
//!                                     │  content  blob → bytes           │
//!                                     └─────────────────────────────────┘
//! ```
//!
//! Blobs are immutable: a content write always lands in a fresh blob, so
//! frozen version entries keep pointing at the bytes they were taken with.

pub mod memory;
pub mod rocks;

pub use memory::MemoryNodeStore;
pub use rocks::{RocksNodeStore, StoreConfig};

use uuid::Uuid;
use vellum_core::{Document, VersionEntry};

/// Storage errors.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// RocksDB internal error
    DatabaseError(String),
    /// Serialization failed
    SerializationError(String),
    /// Deserialization failed
    DeserializationError(String),
    /// Compression error
    CompressionError(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DatabaseError(e) => write!(f, "Database error: {e}"),
            StoreError::SerializationError(e) => write!(f, "Serialization error: {e}"),
            StoreError::DeserializationError(e) => write!(f, "Deserialization error: {e}"),
            StoreError::CompressionError(e) => write!(f, "Compression error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// One write in a [`ChangeSet`].
#[derive(Debug, Clone)]
pub enum NodeOp {
    /// Insert or replace a live record, rebinding its path
    PutNode(Box<Document>),
    /// Remove a live record and its path binding
    RemoveNode(Uuid),
    /// Append a frozen entry to its master's chain
    AppendVersion(Box<VersionEntry>),
    /// Drop a whole chain
    DropHistory(Uuid),
    PutBlob(Uuid, Vec<u8>),
    DropBlob(Uuid),
}

/// Ordered list of writes applied as a unit.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    ops: Vec<NodeOp>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_node(&mut self, document: Document) -> &mut Self {
        self.ops.push(NodeOp::PutNode(Box::new(document)));
        self
    }

    pub fn remove_node(&mut self, id: Uuid) -> &mut Self {
        self.ops.push(NodeOp::RemoveNode(id));
        self
    }

    pub fn append_version(&mut self, entry: VersionEntry) -> &mut Self {
        self.ops.push(NodeOp::AppendVersion(Box::new(entry)));
        self
    }

    pub fn drop_history(&mut self, master_id: Uuid) -> &mut Self {
        self.ops.push(NodeOp::DropHistory(master_id));
        self
    }

    pub fn put_blob(&mut self, blob_id: Uuid, bytes: Vec<u8>) -> &mut Self {
        self.ops.push(NodeOp::PutBlob(blob_id, bytes));
        self
    }

    pub fn drop_blob(&mut self, blob_id: Uuid) -> &mut Self {
        self.ops.push(NodeOp::DropBlob(blob_id));
        self
    }

    /// Live record ids written or removed by this change.
    pub fn touched_nodes(&self) -> Vec<Uuid> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                NodeOp::PutNode(doc) => Some(doc.id()),
                NodeOp::RemoveNode(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn ops(&self) -> &[NodeOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<NodeOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Hierarchical, path-addressable store the repository runs on.
///
/// Live records are returned without history; chains are read with
/// [`NodeStore::load_history`].
pub trait NodeStore {
    fn load_node(&self, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Id bound to a repository path.
    fn resolve_path(&self, path: &str) -> Result<Option<Uuid>, StoreError>;

    /// Every live record, in no particular order.
    fn scan_nodes(&self) -> Result<Vec<Document>, StoreError>;

    /// Frozen chain of a version master, oldest first.
    fn load_history(&self, master_id: Uuid) -> Result<Vec<VersionEntry>, StoreError>;

    fn read_blob(&self, blob_id: Uuid) -> Result<Option<Vec<u8>>, StoreError>;

    /// Next legacy numeric id. Never hands out the same value twice.
    fn next_sequence(&mut self) -> Result<i64, StoreError>;

    fn commit(&mut self, changes: ChangeSet) -> Result<(), StoreError>;
}

/// Strip the transient parts of a record before it is stored.
pub(crate) fn detach(mut document: Document) -> Document {
    if let Some(doc) = document.as_historized_mut() {
        doc.history = Default::default();
    }
    document.state_mut().language.clear();
    document
}
