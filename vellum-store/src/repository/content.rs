//! Per-language content: metadata, blob writes and range reads.

use chrono::Utc;
use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::ops::Range;
use uuid::Uuid;
use vellum_core::{Attachment, Attachments, Document, DocumentKey};

use super::versioning::ensure_editable;
use super::DocumentRepository;
use crate::error::{RepositoryError, Result};
use crate::node::{ChangeSet, NodeStore};

/// Byte range of a read on a `size`-byte payload.
///
/// A negative `start` reads from 0, a negative `len` reads to the end, and
/// both ends are clamped to the payload.
pub fn clamp_range(size: usize, start: i64, len: i64) -> Range<usize> {
    let start = usize::try_from(start.max(0)).unwrap_or(usize::MAX).min(size);
    let end = if len < 0 {
        size
    } else {
        start.saturating_add(usize::try_from(len).unwrap_or(usize::MAX)).min(size)
    };
    start..end
}

/// Blobs a historized working copy may drop: anything not in its base.
fn frozen_blobs(document: &Document) -> BTreeSet<Uuid> {
    document
        .as_historized()
        .and_then(|d| d.versioning.base.as_ref())
        .map(|base| base.attachments.content_ids().collect())
        .unwrap_or_default()
}

impl<S: NodeStore> DocumentRepository<S> {
    /// Add or replace the metadata of one language.
    ///
    /// Stored content of that language is kept.
    pub fn add_content(&mut self, key: &DocumentKey, mut attachment: Attachment) -> Result<()> {
        let mut document = self.require(key.id)?;
        ensure_editable(&document)?;

        let attachments = &mut document.state_mut().attachments;
        match attachments.get(&attachment.language) {
            Some(existing) => {
                attachment.content_id = existing.content_id;
                attachment.size = existing.size;
            }
            None => attachment.content_id = None,
        }
        log::debug!("Adding {} content to {key}", attachment.language);
        attachments.put(attachment);

        let mut changes = ChangeSet::new();
        changes.put_node(document);
        self.save(changes)
    }

    /// Store the bytes of `language` into a fresh blob. Returns the size.
    pub fn store_content(
        &mut self,
        key: &DocumentKey,
        language: &str,
        content: &mut impl Read,
    ) -> Result<u64> {
        let mut document = self.require(key.id)?;
        ensure_editable(&document)?;

        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes)?;
        let size = bytes.len() as u64;

        let frozen = frozen_blobs(&document);
        let blob_id = Uuid::new_v4();
        let attachment = document
            .state_mut()
            .attachments
            .get_mut(language)
            .ok_or_else(|| RepositoryError::NotFound(format!("{} content of {key}", language)))?;
        let previous = attachment.content_id.replace(blob_id);
        attachment.size = size;
        attachment.updated = Some(Utc::now());

        let mut changes = ChangeSet::new();
        changes.put_blob(blob_id, bytes);
        if let Some(previous) = previous.filter(|b| !frozen.contains(b)) {
            changes.drop_blob(previous);
        }
        changes.put_node(document);
        self.save(changes)?;
        log::debug!("Stored {size} bytes of {language} content for {key}");
        Ok(size)
    }

    /// Remove one language with its content.
    pub fn remove_content(&mut self, key: &DocumentKey, language: &str) -> Result<()> {
        let mut document = self.require(key.id)?;
        ensure_editable(&document)?;

        let frozen = frozen_blobs(&document);
        let removed = document
            .state_mut()
            .attachments
            .remove(language)
            .ok_or_else(|| RepositoryError::NotFound(format!("{} content of {key}", language)))?;

        let mut changes = ChangeSet::new();
        if let Some(blob) = removed.content_id.filter(|b| !frozen.contains(b)) {
            changes.drop_blob(blob);
        }
        changes.put_node(document);
        self.save(changes)?;
        log::debug!("Removed {language} content from {key}");
        Ok(())
    }

    /// Bytes of `language` (or the first language) in `[start, start + len)`.
    ///
    /// Unknown documents and missing content read as empty.
    pub fn get_content(&self, key: &DocumentKey, language: &str, start: i64, len: i64) -> Result<Vec<u8>> {
        let Some(document) = self.load_live(key.id)? else {
            return Ok(Vec::new());
        };
        self.read_range(&document.state().attachments, language, start, len)
    }

    /// Stream a range of content into `out`. Returns the number of bytes written.
    pub fn read_content(
        &self,
        key: &DocumentKey,
        language: &str,
        out: &mut impl Write,
        start: i64,
        len: i64,
    ) -> Result<u64> {
        let bytes = self.get_content(key, language, start, len)?;
        out.write_all(&bytes)?;
        out.flush()?;
        Ok(bytes.len() as u64)
    }

    /// Bytes a frozen version referenced.
    pub fn read_version_content(
        &self,
        key: &DocumentKey,
        version_index: u32,
        language: &str,
        start: i64,
        len: i64,
    ) -> Result<Vec<u8>> {
        let Some(document) = self.load_live(key.id)? else {
            return Ok(Vec::new());
        };
        let Some(doc) = document.as_historized() else {
            return Ok(Vec::new());
        };
        let history = self.store.load_history(doc.versioning.master_id)?;
        match history.iter().find(|e| e.version_index == version_index) {
            Some(entry) => self.read_range(&entry.attachments, language, start, len),
            None => Ok(Vec::new()),
        }
    }

    fn read_range(&self, attachments: &Attachments, language: &str, start: i64, len: i64) -> Result<Vec<u8>> {
        let Some(blob_id) = attachments.resolve(language).and_then(|a| a.content_id) else {
            return Ok(Vec::new());
        };
        match self.store.read_blob(blob_id)? {
            Some(bytes) => {
                let range = clamp_range(bytes.len(), start, len);
                Ok(bytes[range].to_vec())
            }
            None => {
                log::warn!("Content blob {blob_id} is missing");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_range(14, -10, 4), 0..4);
        assert_eq!(clamp_range(14, 0, 500_000_000), 0..14);
        assert_eq!(clamp_range(14, 0, 0), 0..0);
        assert_eq!(clamp_range(14, 3, -1), 3..14);
        assert_eq!(clamp_range(14, 20, 5), 14..14);
        assert_eq!(clamp_range(0, 0, 10), 0..0);
        assert_eq!(clamp_range(14, 10, i64::MAX), 10..14);
    }
}
