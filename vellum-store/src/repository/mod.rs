//! Document repository.
//!
//! ```text
//!   create ─► Unlocked ──checkout──► CheckedOut(by) ──checkin──► Unlocked
//!                │  ▲                    │   update / content / order
//!                │  └──── unlock ────────┘   (working copy)
//!                │
//!                ├─ bypass ops (roles, displayable, editable, order)
//!                │    historized: one technical entry, same major.minor
//!                ├─ move ─► same id (or a new one under path ids)
//!                └─ copy ─► new id, new version master, cloned chain
//! ```
//!
//! Every mutation loads the live record, derives the new one and commits a
//! single [`ChangeSet`]. The header cache is invalidated for every touched
//! record before the commit.

mod content;
mod ordering;
mod relocation;
mod versioning;

pub use content::clamp_range;
pub use versioning::DocumentPatch;

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use uuid::Uuid;
use vellum_core::{
    repository_path, Attachment, Document, DocumentKey, DocumentState, DocumentType, ForeignRef,
    HistorizedDocument, History, LegacyOrigin, Role, UserId,
};

use crate::cache::{CacheStats, HeaderCache};
use crate::config::RepositoryConfig;
use crate::error::{RepositoryError, Result};
use crate::node::{ChangeSet, NodeStore};

/// Parameters of a document to create.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner: ForeignRef,
    pub document_type: DocumentType,
    pub created_by: UserId,
    /// Requested order; non-positive values append
    pub order: i32,
    pub versioned: bool,
    pub public: bool,
    pub legacy_id: Option<i64>,
    pub origin: LegacyOrigin,
    pub attachment: Option<Attachment>,
    pub alert_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub displayable_as_content: bool,
    pub editable_simultaneously: Option<bool>,
    pub forbidden_download_roles: Option<BTreeSet<Role>>,
    pub comment: Option<String>,
}

impl NewDocument {
    pub fn new(owner: ForeignRef, created_by: impl Into<UserId>) -> Self {
        Self {
            owner,
            document_type: DocumentType::Attachment,
            created_by: created_by.into(),
            order: 0,
            versioned: false,
            public: true,
            legacy_id: None,
            origin: LegacyOrigin::Native,
            attachment: None,
            alert_date: None,
            expiry_date: None,
            displayable_as_content: true,
            editable_simultaneously: None,
            forbidden_download_roles: None,
            comment: None,
        }
    }

    /// Make the document historized, starting public (1.0) or private (0.1).
    pub fn versioned(mut self, public: bool) -> Self {
        self.versioned = true;
        self.public = public;
        self
    }

    pub fn document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = document_type;
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Reuse a legacy numeric id instead of drawing a new one.
    pub fn legacy_id(mut self, legacy_id: i64, origin: LegacyOrigin) -> Self {
        self.legacy_id = Some(legacy_id);
        self.origin = origin;
        self
    }

    pub fn alert_date(mut self, date: DateTime<Utc>) -> Self {
        self.alert_date = Some(date);
        self
    }

    pub fn expiry_date(mut self, date: DateTime<Utc>) -> Self {
        self.expiry_date = Some(date);
        self
    }

    pub fn displayable_as_content(mut self, displayable: bool) -> Self {
        self.displayable_as_content = displayable;
        self
    }

    pub fn editable_simultaneously(mut self, editable: bool) -> Self {
        self.editable_simultaneously = Some(editable);
        self
    }

    pub fn forbidden_download_roles(mut self, roles: BTreeSet<Role>) -> Self {
        self.forbidden_download_roles = Some(roles);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Versioned multilingual document repository over a [`NodeStore`].
pub struct DocumentRepository<S: NodeStore> {
    store: S,
    config: RepositoryConfig,
    cache: HeaderCache,
}

impl<S: NodeStore> DocumentRepository<S> {
    pub fn new(store: S, config: RepositoryConfig) -> Self {
        let cache = HeaderCache::new(config.header_cache_capacity);
        Self {
            store,
            config,
            cache,
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ─── Creation ─────────────────────────────────────────────────────

    /// Create a document. Content, if any, is added afterwards.
    pub fn create_document(&mut self, new: NewDocument) -> Result<DocumentKey> {
        let document = self.prepare(new)?;
        let key = document.key().clone();
        let mut changes = ChangeSet::new();
        changes.put_node(document);
        self.save(changes)?;
        log::info!("Created document {key}");
        Ok(key)
    }

    /// Create a document and store its initial content in the same commit.
    pub fn create_document_with_content(
        &mut self,
        new: NewDocument,
        content: &mut impl Read,
    ) -> Result<DocumentKey> {
        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes)?;

        let mut document = self.prepare(new)?;
        let state = document.state_mut();
        let language = state
            .attachments
            .languages()
            .next()
            .map(str::to_string)
            .ok_or_else(|| {
                RepositoryError::InvariantViolation(format!(
                    "document {} has no attachment to hold content",
                    state.key.id
                ))
            })?;
        let blob_id = Uuid::new_v4();
        if let Some(attachment) = state.attachments.get_mut(&language) {
            attachment.content_id = Some(blob_id);
            attachment.size = bytes.len() as u64;
        }

        let key = document.key().clone();
        let mut changes = ChangeSet::new();
        changes.put_blob(blob_id, bytes).put_node(document);
        self.save(changes)?;
        log::info!("Created document {key} with {language} content");
        Ok(key)
    }

    fn prepare(&mut self, new: NewDocument) -> Result<Document> {
        let legacy_id = match new.legacy_id {
            Some(id) => id,
            None => self.store.next_sequence()?,
        };
        let node_name = new.origin.node_name(legacy_id);
        let container_id = new.owner.container_id.clone();

        let path = repository_path(&container_id, new.document_type, &node_name);
        self.ensure_free_path(&path, Uuid::nil())?;

        let bounds = self.min_max_order_indexes(&container_id, &new.owner.foreign_id, new.document_type)?;
        let order = self.config.order_policy().allocate(new.order, bounds);
        if new.order < 0 {
            log::warn!("Order {} requested for {path} reassigned to {order}", new.order);
        } else if order != new.order {
            log::debug!("Allocated order {order} for {path}");
        }

        let key = DocumentKey::new(Uuid::new_v4(), container_id).with_legacy_id(legacy_id);
        let mut state = DocumentState::new(
            key,
            node_name,
            new.owner.foreign_id,
            new.document_type,
            new.created_by,
        );
        state.order = order;
        state.public = new.public;
        state.alert_date = new.alert_date;
        state.expiry_date = new.expiry_date;
        state.displayable_as_content = new.displayable_as_content;
        state.editable_simultaneously = new.editable_simultaneously;
        state.forbidden_download_roles = new.forbidden_download_roles;
        state.comment = new.comment;
        if let Some(mut attachment) = new.attachment {
            attachment.content_id = None;
            state.attachments.put(attachment);
        }

        Ok(if new.versioned {
            Document::Historized(HistorizedDocument::new(state))
        } else {
            Document::Simple(state)
        })
    }

    // ─── Lookup ───────────────────────────────────────────────────────

    /// Document by id, read in `language`. Unknown ids yield `None`.
    pub fn find_document_by_id(&self, key: &DocumentKey, language: &str) -> Result<Option<Document>> {
        match self.load_live(key.id)? {
            Some(document) => Ok(Some(self.hydrate(document, language)?)),
            None => Ok(None),
        }
    }

    /// Document by legacy numeric id within a container.
    ///
    /// When both a plain and a version-managed document carry the id, the
    /// version-managed one wins if `prefer_versioned` is set.
    pub fn find_document_by_legacy_id(
        &self,
        container_id: &str,
        legacy_id: i64,
        prefer_versioned: bool,
        language: &str,
    ) -> Result<Option<Document>> {
        let origins = if prefer_versioned {
            [LegacyOrigin::Versioning, LegacyOrigin::Native, LegacyOrigin::Attachment]
        } else {
            [LegacyOrigin::Native, LegacyOrigin::Attachment, LegacyOrigin::Versioning]
        };
        const TYPES: [DocumentType; 6] = [
            DocumentType::Attachment,
            DocumentType::Form,
            DocumentType::Image,
            DocumentType::Video,
            DocumentType::Wysiwyg,
            DocumentType::Node,
        ];
        for origin in origins {
            let node_name = origin.node_name(legacy_id);
            for document_type in TYPES {
                let path = repository_path(container_id, document_type, &node_name);
                if let Some(document) = self.find_by_path(&path, language)? {
                    return Ok(Some(document));
                }
            }
        }
        Ok(None)
    }

    pub fn find_by_path(&self, path: &str, language: &str) -> Result<Option<Document>> {
        match self.store.resolve_path(path)? {
            Some(id) => self.find_document_by_id(&DocumentKey::new(id, ""), language),
            None => Ok(None),
        }
    }

    /// Sibling with the highest order.
    pub fn find_last(
        &self,
        container_id: &str,
        foreign_id: &str,
        document_type: DocumentType,
    ) -> Result<Option<Document>> {
        let last = self
            .siblings(container_id, foreign_id, Some(document_type))?
            .into_iter()
            .max_by_key(|d| (d.state().order, d.key().legacy_id));
        match last {
            Some(document) => Ok(Some(self.hydrate(document, &self.config.default_language)?)),
            None => Ok(None),
        }
    }

    // ─── Deletion ─────────────────────────────────────────────────────

    /// Delete a document with its history and content.
    pub fn delete_document(&mut self, key: &DocumentKey) -> Result<()> {
        let document = self.require(key.id)?;
        let mut changes = ChangeSet::new();
        self.delete_changes(&document, &mut changes)?;
        self.save(changes)?;
        log::info!("Deleted document {}", document.key());
        Ok(())
    }

    fn delete_changes(&self, document: &Document, changes: &mut ChangeSet) -> Result<()> {
        let mut blobs: HashSet<Uuid> = document.content_ids().into_iter().collect();
        if let Some(doc) = document.as_historized() {
            for entry in self.store.load_history(doc.versioning.master_id)? {
                blobs.extend(entry.attachments.content_ids());
            }
            changes.drop_history(doc.versioning.master_id);
        }
        for blob in blobs {
            changes.drop_blob(blob);
        }
        changes.remove_node(document.id());
        Ok(())
    }

    pub fn delete_all_by_foreign_key(&mut self, owner: &ForeignRef) -> Result<Vec<DocumentKey>> {
        let documents = self.siblings(&owner.container_id, &owner.foreign_id, None)?;
        self.delete_all(documents)
    }

    pub fn delete_all_by_container(&mut self, container_id: &str) -> Result<Vec<DocumentKey>> {
        let documents: Vec<Document> = self
            .store
            .scan_nodes()?
            .into_iter()
            .filter(|d| d.key().container_id == container_id)
            .collect();
        self.delete_all(documents)
    }

    fn delete_all(&mut self, documents: Vec<Document>) -> Result<Vec<DocumentKey>> {
        let mut deleted = Vec::with_capacity(documents.len());
        for document in documents {
            self.delete_document(document.key())?;
            deleted.push(document.key().clone());
        }
        Ok(deleted)
    }

    // ─── Helpers ──────────────────────────────────────────────────────

    /// Live record, through the header cache.
    fn load_live(&self, id: Uuid) -> Result<Option<Document>> {
        if let Some(document) = self.cache.get(id) {
            return Ok(Some(document));
        }
        let document = self.store.load_node(id)?;
        if let Some(document) = &document {
            self.cache.put(document);
        }
        Ok(document)
    }

    fn require(&self, id: Uuid) -> Result<Document> {
        self.load_live(id)?
            .ok_or_else(|| RepositoryError::not_found(id))
    }

    /// Attach history and the read language.
    pub(crate) fn hydrate(&self, mut document: Document, language: &str) -> Result<Document> {
        if let Some(doc) = document.as_historized_mut() {
            doc.history = History::from_entries(self.store.load_history(doc.versioning.master_id)?);
            if doc.history.len() != doc.versioning.version_index as usize {
                log::warn!(
                    "Document {} has {} frozen entries for version index {}",
                    doc.state.key,
                    doc.history.len(),
                    doc.versioning.version_index
                );
            }
        }
        let language = if language.is_empty() {
            self.config.default_language.as_str()
        } else {
            language
        };
        Ok(document.with_language(language))
    }

    /// Documents of one owner, optionally of one type.
    pub(crate) fn siblings(
        &self,
        container_id: &str,
        foreign_id: &str,
        document_type: Option<DocumentType>,
    ) -> Result<Vec<Document>> {
        Ok(self
            .store
            .scan_nodes()?
            .into_iter()
            .filter(|d| {
                let state = d.state();
                state.key.container_id == container_id
                    && state.foreign_id == foreign_id
                    && document_type.map_or(true, |t| state.document_type == t)
            })
            .collect())
    }

    /// Fail if `path` is bound to a record other than `id`.
    fn ensure_free_path(&self, path: &str, id: Uuid) -> Result<()> {
        match self.store.resolve_path(path)? {
            Some(bound) if bound != id => Err(RepositoryError::NameCollision(path.to_string())),
            _ => Ok(()),
        }
    }

    /// Invalidate touched records, then commit.
    fn save(&mut self, changes: ChangeSet) -> Result<()> {
        for id in changes.touched_nodes() {
            self.cache.invalidate(id);
        }
        self.store.commit(changes)?;
        Ok(())
    }
}
