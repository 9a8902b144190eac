//! In-memory node store.

use std::collections::HashMap;
use uuid::Uuid;
use vellum_core::{Document, VersionEntry};

use super::{detach, ChangeSet, NodeOp, NodeStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryNodeStore {
    nodes: HashMap<Uuid, Document>,
    paths: HashMap<String, Uuid>,
    versions: HashMap<Uuid, Vec<VersionEntry>>,
    blobs: HashMap<Uuid, Vec<u8>>,
    sequence: i64,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    fn apply(&mut self, op: NodeOp) {
        match op {
            NodeOp::PutNode(document) => {
                let document = detach(*document);
                let id = document.id();
                if let Some(previous) = self.nodes.get(&id) {
                    self.paths.remove(&previous.state().path());
                }
                self.paths.insert(document.state().path(), id);
                self.nodes.insert(id, document);
            }
            NodeOp::RemoveNode(id) => {
                if let Some(previous) = self.nodes.remove(&id) {
                    self.paths.remove(&previous.state().path());
                }
            }
            NodeOp::AppendVersion(entry) => {
                self.versions.entry(entry.master_id).or_default().push(*entry);
            }
            NodeOp::DropHistory(master_id) => {
                self.versions.remove(&master_id);
            }
            NodeOp::PutBlob(blob_id, bytes) => {
                self.blobs.insert(blob_id, bytes);
            }
            NodeOp::DropBlob(blob_id) => {
                self.blobs.remove(&blob_id);
            }
        }
    }
}

impl NodeStore for MemoryNodeStore {
    fn load_node(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        Ok(self.nodes.get(&id).cloned())
    }

    fn resolve_path(&self, path: &str) -> Result<Option<Uuid>, StoreError> {
        Ok(self.paths.get(path).copied())
    }

    fn scan_nodes(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.nodes.values().cloned().collect())
    }

    fn load_history(&self, master_id: Uuid) -> Result<Vec<VersionEntry>, StoreError> {
        Ok(self.versions.get(&master_id).cloned().unwrap_or_default())
    }

    fn read_blob(&self, blob_id: Uuid) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.get(&blob_id).cloned())
    }

    fn next_sequence(&mut self) -> Result<i64, StoreError> {
        self.sequence += 1;
        Ok(self.sequence)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<(), StoreError> {
        for op in changes.into_ops() {
            self.apply(op);
        }
        Ok(())
    }
}
