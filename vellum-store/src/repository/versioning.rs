//! Checkout, checkin and the operations that bypass them.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;
use vellum_core::{
    Attachment, Document, DocumentKey, HistorizedDocument, Role, UnlockOptions,
};

use super::DocumentRepository;
use crate::error::{RepositoryError, Result};
use crate::node::{ChangeSet, NodeStore};

/// Attribute changes applied by [`DocumentRepository::update_document`].
///
/// `None` leaves a field alone; `Some(None)` clears an optional one.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub public: Option<bool>,
    pub alert_date: Option<Option<DateTime<Utc>>>,
    pub expiry_date: Option<Option<DateTime<Utc>>>,
    pub comment: Option<Option<String>>,
    pub clone_id: Option<Option<Uuid>>,
    /// Replaces the metadata of `attachment.language`; stored content is kept
    pub attachment: Option<Attachment>,
}

impl DocumentPatch {
    pub fn public(mut self, public: bool) -> Self {
        self.public = Some(public);
        self
    }

    pub fn alert_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.alert_date = Some(date);
        self
    }

    pub fn expiry_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.expiry_date = Some(date);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(Some(comment.into()));
        self
    }

    pub fn clone_id(mut self, clone_id: Option<Uuid>) -> Self {
        self.clone_id = Some(clone_id);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Historized documents only change through a checkout.
pub(super) fn ensure_editable(document: &Document) -> Result<()> {
    if document.is_versioned() && !document.is_checked_out() {
        return Err(RepositoryError::NotLocked(document.id()));
    }
    Ok(())
}

fn release(document: &mut Document) {
    let state = document.state_mut();
    state.editor = None;
    state.reservation_date = None;
}

/// Freeze the committed base into history and advance the version.
fn commit_working_copy(
    document: &mut Document,
    keep_locked: bool,
    changes: &mut ChangeSet,
) -> Result<()> {
    let editor = document
        .editor()
        .map(str::to_string)
        .ok_or(RepositoryError::NotLocked(document.id()))?;

    if let Some(doc) = document.as_historized_mut() {
        let mut entry = doc.versioning.base.take().ok_or_else(|| {
            RepositoryError::InvariantViolation(format!(
                "checked out document {} has no committed base",
                doc.state.key.id
            ))
        })?;
        entry.frozen_by = Some(editor);
        changes.append_version(*entry);
        doc.advance(true);
        if keep_locked {
            doc.versioning.base = Some(Box::new(doc.freeze(None, Utc::now())));
        }
        log::debug!(
            "Document {} checked in as {} (index {})",
            doc.state.key,
            doc.versioning.version,
            doc.versioning.version_index
        );
    }
    if !keep_locked {
        release(document);
    }
    Ok(())
}

/// Restore the committed state and drop the blobs only the working copy used.
fn cancel_working_copy(doc: &mut HistorizedDocument, changes: &mut ChangeSet) {
    let Some(base) = doc.versioning.base.take() else {
        return;
    };
    let kept: BTreeSet<Uuid> = base.attachments.content_ids().collect();
    for blob in doc.state.attachments.content_ids() {
        if !kept.contains(&blob) {
            changes.drop_blob(blob);
        }
    }
    doc.state.restore(&base);
}

impl<S: NodeStore> DocumentRepository<S> {
    /// Reserve a document for `user`. Checking out again as the holder is a no-op.
    pub fn checkout(&mut self, key: &DocumentKey, user: &str) -> Result<()> {
        let mut document = self.require(key.id)?;
        match document.editor() {
            Some(holder) if holder == user => return Ok(()),
            Some(holder) => {
                return Err(RepositoryError::AlreadyLocked {
                    id: key.id,
                    holder: holder.to_string(),
                })
            }
            None => {}
        }

        let now = Utc::now();
        let state = document.state_mut();
        state.editor = Some(user.to_string());
        state.reservation_date = Some(now);
        if let Some(doc) = document.as_historized_mut() {
            doc.versioning.base = Some(Box::new(doc.freeze(None, now)));
        }

        let mut changes = ChangeSet::new();
        changes.put_node(document);
        self.save(changes)?;
        log::debug!("Document {key} checked out by {user}");
        Ok(())
    }

    /// Commit the working copy.
    ///
    /// A historized document freezes its committed state into history and
    /// moves to the next functional version: `major + 1` when the working
    /// copy is public, `minor + 1` otherwise.
    pub fn checkin(&mut self, key: &DocumentKey, keep_locked: bool) -> Result<()> {
        let mut document = self.require(key.id)?;
        let mut changes = ChangeSet::new();
        commit_working_copy(&mut document, keep_locked, &mut changes)?;
        changes.put_node(document);
        self.save(changes)
    }

    /// Release a checkout.
    ///
    /// With [`UnlockOptions::UPLOAD`] or [`UnlockOptions::WEBDAV`] the working
    /// copy is checked in, public unless [`UnlockOptions::PRIVATE_VERSION`] is
    /// set. Otherwise the checkout is cancelled and the committed state
    /// restored. Another user's lock needs [`UnlockOptions::FORCE`].
    ///
    /// Returns `false` if the document was not checked out.
    pub fn unlock(&mut self, key: &DocumentKey, user: &str, options: UnlockOptions) -> Result<bool> {
        let mut document = self.require(key.id)?;
        let holder = match document.editor() {
            Some(holder) => holder.to_string(),
            None => return Ok(false),
        };
        if holder != user && !options.contains(UnlockOptions::FORCE) {
            return Err(RepositoryError::AlreadyLocked { id: key.id, holder });
        }

        let mut changes = ChangeSet::new();
        if document.is_versioned() && options.commits_content() {
            document.state_mut().public = !options.contains(UnlockOptions::PRIVATE_VERSION);
            commit_working_copy(&mut document, false, &mut changes)?;
        } else {
            if let Some(doc) = document.as_historized_mut() {
                cancel_working_copy(doc, &mut changes);
            }
            release(&mut document);
        }
        changes.put_node(document);
        self.save(changes)?;
        log::debug!("Document {key} unlocked by {user} with {options}");
        Ok(true)
    }

    /// Apply a patch to the working copy, or in place for a simple document.
    pub fn update_document(&mut self, key: &DocumentKey, patch: DocumentPatch) -> Result<()> {
        let mut document = self.require(key.id)?;
        ensure_editable(&document)?;

        let state = document.state_mut();
        if let Some(public) = patch.public {
            state.public = public;
        }
        if let Some(alert_date) = patch.alert_date {
            state.alert_date = alert_date;
        }
        if let Some(expiry_date) = patch.expiry_date {
            state.expiry_date = expiry_date;
        }
        if let Some(comment) = patch.comment {
            state.comment = comment;
        }
        if let Some(clone_id) = patch.clone_id {
            state.clone_id = clone_id;
        }
        if let Some(mut attachment) = patch.attachment {
            if let Some(existing) = state.attachments.get(&attachment.language) {
                attachment.content_id = existing.content_id;
                attachment.size = existing.size;
            } else {
                attachment.content_id = None;
            }
            state.attachments.put(attachment);
        }

        let mut changes = ChangeSet::new();
        changes.put_node(document);
        self.save(changes)
    }

    // ─── Operations that bypass checkout ──────────────────────────────

    pub fn save_forbidden_download_roles(
        &mut self,
        key: &DocumentKey,
        roles: Option<BTreeSet<Role>>,
    ) -> Result<()> {
        let roles = roles.filter(|r| !r.is_empty());
        self.bypass(key, move |document| {
            document.state_mut().forbidden_download_roles = roles;
        })
    }

    pub fn save_displayable_as_content(&mut self, key: &DocumentKey, displayable: bool) -> Result<()> {
        self.bypass(key, move |document| {
            document.state_mut().displayable_as_content = displayable;
        })
    }

    pub fn save_editable_simultaneously(
        &mut self,
        key: &DocumentKey,
        editable: Option<bool>,
    ) -> Result<()> {
        self.bypass(key, move |document| {
            document.state_mut().editable_simultaneously = editable;
        })
    }

    /// Set an order verbatim.
    pub fn set_order(&mut self, key: &DocumentKey, order: i32) -> Result<()> {
        self.bypass(key, move |document| {
            document.state_mut().order = order;
        })
    }

    /// Apply `change` to the working copy if checked out. Otherwise a
    /// historized document first freezes its current state as a technical
    /// entry; its functional version stays.
    fn bypass(&mut self, key: &DocumentKey, change: impl FnOnce(&mut Document)) -> Result<()> {
        let mut document = self.require(key.id)?;
        let mut changes = ChangeSet::new();
        if !document.is_checked_out() {
            if let Some(doc) = document.as_historized_mut() {
                changes.append_version(doc.freeze(None, Utc::now()));
                doc.advance(false);
            }
        }
        change(&mut document);
        changes.put_node(document);
        self.save(changes)
    }

    /// Switch between simple and historized in place.
    ///
    /// Historized → simple discards the history; simple → historized seeds
    /// a public 1.0 with an empty history.
    pub fn change_version_state(
        &mut self,
        key: &DocumentKey,
        comment: Option<String>,
    ) -> Result<DocumentKey> {
        let document = self.require(key.id)?;
        if let Some(holder) = document.editor() {
            return Err(RepositoryError::AlreadyLocked {
                id: key.id,
                holder: holder.to_string(),
            });
        }

        let mut changes = ChangeSet::new();
        let mut converted = match document {
            Document::Historized(doc) => {
                let live: BTreeSet<Uuid> = doc.state.attachments.content_ids().collect();
                let frozen: BTreeSet<Uuid> = self
                    .store
                    .load_history(doc.versioning.master_id)?
                    .iter()
                    .flat_map(|entry| entry.attachments.content_ids())
                    .collect();
                for blob in frozen.difference(&live) {
                    changes.drop_blob(*blob);
                }
                changes.drop_history(doc.versioning.master_id);
                Document::Historized(doc).into_simple()
            }
            simple => simple.into_historized(),
        };
        if comment.is_some() {
            converted.state_mut().comment = comment;
        }

        let key = converted.key().clone();
        log::info!(
            "Document {key} is now {}",
            if converted.is_versioned() { "historized" } else { "simple" }
        );
        changes.put_node(converted);
        self.save(changes)?;
        Ok(key)
    }
}
