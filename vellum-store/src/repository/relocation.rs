//! Move and copy.
//!
//! A move keeps the version master and appends one technical entry frozen
//! at the origin, so every entry keeps pointing at where it was authored
//! while `pk` follows the live document. A copy gets a new id, a new legacy
//! id and a new version master; its chain is cloned entry by entry and
//! re-anchored at the destination, and every blob is duplicated so the two
//! documents never share content.

use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;
use vellum_core::{repository_path, Attachments, DocumentKey, ForeignRef, LegacyOrigin};

use super::DocumentRepository;
use crate::error::Result;
use crate::node::{ChangeSet, NodeStore};

/// Point every attachment at its duplicated blob.
fn remap(attachments: &mut Attachments, blobs: &HashMap<Uuid, Uuid>) {
    for attachment in attachments.iter_mut() {
        if let Some(id) = attachment.content_id {
            attachment.content_id = blobs.get(&id).copied();
        }
    }
}

impl<S: NodeStore> DocumentRepository<S> {
    /// Move a document to another owner. Returns its key at the destination.
    ///
    /// The id changes only when the destination container uses path ids; the
    /// record under the old id is then gone. A checked-out document stays
    /// checked out and records no version.
    pub fn move_document(&mut self, key: &DocumentKey, destination: &ForeignRef) -> Result<DocumentKey> {
        let mut document = self.require(key.id)?;
        let origin = document.key().clone();

        let new_id = if self.config.uses_path_ids(&destination.container_id) {
            Uuid::new_v4()
        } else {
            origin.id
        };
        let state = document.state();
        let path = repository_path(&destination.container_id, state.document_type, &state.node_name);
        self.ensure_free_path(&path, origin.id)?;

        let mut changes = ChangeSet::new();
        if !document.is_checked_out() {
            if let Some(doc) = document.as_historized_mut() {
                changes.append_version(doc.freeze(None, Utc::now()));
                doc.advance(false);
            }
        }

        let state = document.state_mut();
        state.key = DocumentKey {
            id: new_id,
            container_id: destination.container_id.clone(),
            legacy_id: origin.legacy_id,
        };
        state.foreign_id = destination.foreign_id.clone();
        let moved = state.key.clone();

        if new_id != origin.id {
            changes.remove_node(origin.id);
        }
        changes.put_node(document);
        self.save(changes)?;
        log::info!("Moved document {origin} to {moved} ({})", destination.foreign_id);
        Ok(moved)
    }

    /// Copy a document to another owner. Returns the key of the copy.
    ///
    /// The copy starts released, with the source's version counters and a
    /// cloned chain.
    pub fn copy_document(&mut self, key: &DocumentKey, destination: &ForeignRef) -> Result<DocumentKey> {
        let source = self.require(key.id)?;
        let legacy_id = self.store.next_sequence()?;
        let node_name = LegacyOrigin::Native.node_name(legacy_id);
        let path = repository_path(
            &destination.container_id,
            source.state().document_type,
            &node_name,
        );
        self.ensure_free_path(&path, Uuid::nil())?;

        let history = match source.as_historized() {
            Some(doc) => self.store.load_history(doc.versioning.master_id)?,
            None => Vec::new(),
        };

        let mut changes = ChangeSet::new();
        let mut blobs = HashMap::new();
        let referenced = source
            .state()
            .attachments
            .content_ids()
            .chain(history.iter().flat_map(|e| e.attachments.content_ids()));
        for blob in referenced {
            if blobs.contains_key(&blob) {
                continue;
            }
            match self.store.read_blob(blob)? {
                Some(bytes) => {
                    let copy = Uuid::new_v4();
                    changes.put_blob(copy, bytes);
                    blobs.insert(blob, copy);
                }
                None => log::warn!("Content blob {blob} of {} is missing", source.key()),
            }
        }

        let target = DocumentKey::new(Uuid::new_v4(), destination.container_id.clone())
            .with_legacy_id(legacy_id);
        let mut copy = source.clone();
        let state = copy.state_mut();
        state.key = target.clone();
        state.node_name = node_name;
        state.foreign_id = destination.foreign_id.clone();
        state.editor = None;
        state.reservation_date = None;
        state.clone_id = None;
        remap(&mut state.attachments, &blobs);

        if let Some(doc) = copy.as_historized_mut() {
            doc.versioning.master_id = target.id;
            doc.versioning.base = None;
            for entry in &history {
                let mut cloned = entry.cloned_into(target.id, &target, &destination.foreign_id);
                remap(&mut cloned.attachments, &blobs);
                changes.append_version(cloned);
            }
        }

        changes.put_node(copy);
        self.save(changes)?;
        log::info!("Copied document {} to {target} ({})", source.key(), destination.foreign_id);
        Ok(target)
    }

    /// Move every document of `from` to `to`. Returns the new keys.
    pub fn move_all(&mut self, from: &ForeignRef, to: &ForeignRef) -> Result<Vec<DocumentKey>> {
        let documents = self.siblings(&from.container_id, &from.foreign_id, None)?;
        let mut moved = Vec::with_capacity(documents.len());
        for document in documents {
            moved.push(self.move_document(document.key(), to)?);
        }
        Ok(moved)
    }

    /// Copy every document of `from` to `to`. Returns the keys of the copies.
    pub fn copy_all(&mut self, from: &ForeignRef, to: &ForeignRef) -> Result<Vec<DocumentKey>> {
        let documents = self.siblings(&from.container_id, &from.foreign_id, None)?;
        let mut copies = Vec::with_capacity(documents.len());
        for document in documents {
            copies.push(self.copy_document(document.key(), to)?);
        }
        Ok(copies)
    }
}
