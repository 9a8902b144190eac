//! Document model.
//!
//! ```text
//!          Document
//!        ┌────┴─────────────┐
//!     Simple            Historized
//!   DocumentState     DocumentState + VersionState + History
//! ```
//!
//! Shared attributes live in [`DocumentState`]. The historized variant adds
//! the version counters and, while checked out, the frozen committed state
//! (`base`) that a checkin appends to history or a cancel restores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

use crate::attachment::{Attachment, Attachments};
use crate::error::ModelError;
use crate::key::{repository_path, DocumentKey, DocumentType, LegacyOrigin, UserId};
use crate::version::{FunctionalVersion, History, VersionEntry};

/// Access role, as stored in forbidden download role sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Publisher,
    Writer,
    Reader,
    User,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Publisher => "publisher",
            Role::Writer => "writer",
            Role::Reader => "reader",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "publisher" => Ok(Role::Publisher),
            "writer" => Ok(Role::Writer),
            "reader" => Ok(Role::Reader),
            "user" => Ok(Role::User),
            other => Err(ModelError::UnknownRole(other.to_string())),
        }
    }
}

/// Attributes shared by both document variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentState {
    pub key: DocumentKey,
    /// Last path segment, derived from the legacy id and origin
    pub node_name: String,
    pub foreign_id: String,
    pub document_type: DocumentType,
    /// Sibling sort key
    pub order: i32,
    /// Set exactly while checked out
    pub editor: Option<UserId>,
    pub reservation_date: Option<DateTime<Utc>>,
    pub alert_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub public: bool,
    pub displayable_as_content: bool,
    pub editable_simultaneously: Option<bool>,
    pub forbidden_download_roles: Option<BTreeSet<Role>>,
    pub clone_id: Option<Uuid>,
    pub comment: Option<String>,
    pub created_by: UserId,
    pub creation_date: DateTime<Utc>,
    pub attachments: Attachments,
    /// Language the document was read in
    #[serde(skip)]
    pub language: String,
}

impl DocumentState {
    pub fn new(
        key: DocumentKey,
        node_name: impl Into<String>,
        foreign_id: impl Into<String>,
        document_type: DocumentType,
        created_by: impl Into<UserId>,
    ) -> Self {
        Self {
            key,
            node_name: node_name.into(),
            foreign_id: foreign_id.into(),
            document_type,
            order: 0,
            editor: None,
            reservation_date: None,
            alert_date: None,
            expiry_date: None,
            public: true,
            displayable_as_content: true,
            editable_simultaneously: None,
            forbidden_download_roles: None,
            clone_id: None,
            comment: None,
            created_by: created_by.into(),
            creation_date: Utc::now(),
            attachments: Attachments::new(),
            language: String::new(),
        }
    }

    pub fn path(&self) -> String {
        repository_path(&self.key.container_id, self.document_type, &self.node_name)
    }

    pub fn legacy_origin(&self) -> LegacyOrigin {
        LegacyOrigin::of_node_name(&self.node_name)
    }

    /// Restore the attributes a version snapshot captured.
    ///
    /// Location fields are left alone: a snapshot never moves a document.
    pub fn restore(&mut self, entry: &VersionEntry) {
        self.public = entry.public;
        self.order = entry.order;
        self.forbidden_download_roles = entry.forbidden_download_roles.clone();
        self.displayable_as_content = entry.displayable_as_content;
        self.editable_simultaneously = entry.editable_simultaneously;
        self.attachments = entry.attachments.clone();
        self.comment = entry.comment.clone();
    }
}

/// Version counters of a historized document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionState {
    /// Root identity of the history chain
    pub master_id: Uuid,
    /// Index the next frozen entry will receive
    pub version_index: u32,
    pub version: FunctionalVersion,
    /// Committed state frozen at checkout
    pub base: Option<Box<VersionEntry>>,
}

/// Document with a technical history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorizedDocument {
    pub state: DocumentState,
    pub versioning: VersionState,
    /// Loaded separately from the record
    #[serde(skip)]
    pub history: History,
}

impl HistorizedDocument {
    pub fn new(state: DocumentState) -> Self {
        let versioning = VersionState {
            master_id: state.key.id,
            version_index: 0,
            version: FunctionalVersion::initial(state.public),
            base: None,
        };
        Self {
            state,
            versioning,
            history: History::new(),
        }
    }

    /// Freeze the current state at the current index.
    pub fn freeze(&self, by: Option<UserId>, now: DateTime<Utc>) -> VersionEntry {
        VersionEntry::freeze(
            &self.state,
            self.versioning.master_id,
            self.versioning.version_index,
            self.versioning.version,
            by,
            now,
        )
    }

    /// Account for one appended entry. A functional step recomputes
    /// `major.minor` from the public flag.
    pub fn advance(&mut self, functional: bool) {
        self.versioning.version_index += 1;
        if functional {
            self.versioning.version = self.versioning.version.next(self.state.public);
        }
    }

    pub fn functional_history(&self) -> Vec<&VersionEntry> {
        self.history.functional(self.versioning.version)
    }

    pub fn previous_version(&self) -> Option<&VersionEntry> {
        self.history.previous(self.versioning.version_index)
    }

    pub fn last_public_version(&self) -> Option<&VersionEntry> {
        self.history.last_public()
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Document {
    Simple(DocumentState),
    Historized(HistorizedDocument),
}

impl Document {
    pub fn state(&self) -> &DocumentState {
        match self {
            Document::Simple(state) => state,
            Document::Historized(doc) => &doc.state,
        }
    }

    pub fn state_mut(&mut self) -> &mut DocumentState {
        match self {
            Document::Simple(state) => state,
            Document::Historized(doc) => &mut doc.state,
        }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.state().key
    }

    pub fn id(&self) -> Uuid {
        self.state().key.id
    }

    pub fn is_versioned(&self) -> bool {
        matches!(self, Document::Historized(_))
    }

    pub fn as_historized(&self) -> Option<&HistorizedDocument> {
        match self {
            Document::Historized(doc) => Some(doc),
            Document::Simple(_) => None,
        }
    }

    pub fn as_historized_mut(&mut self) -> Option<&mut HistorizedDocument> {
        match self {
            Document::Historized(doc) => Some(doc),
            Document::Simple(_) => None,
        }
    }

    /// Functional version; `0.0` for simple documents.
    pub fn version(&self) -> FunctionalVersion {
        self.as_historized()
            .map_or(FunctionalVersion::ZERO, |doc| doc.versioning.version)
    }

    pub fn version_index(&self) -> u32 {
        self.as_historized()
            .map_or(0, |doc| doc.versioning.version_index)
    }

    /// Version master id; a simple document is its own master.
    pub fn version_master(&self) -> Uuid {
        self.as_historized()
            .map_or(self.id(), |doc| doc.versioning.master_id)
    }

    pub fn is_checked_out(&self) -> bool {
        self.state().editor.is_some()
    }

    pub fn editor(&self) -> Option<&str> {
        self.state().editor.as_deref()
    }

    pub fn language(&self) -> &str {
        &self.state().language
    }

    /// Attachment in the read language, falling back to the first one.
    pub fn attachment(&self) -> Option<&Attachment> {
        let state = self.state();
        state.attachments.resolve(&state.language)
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.state_mut().language = language.into();
        self
    }

    /// Blob ids referenced by the live state and the pending base.
    pub fn content_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.state().attachments.content_ids().collect();
        if let Some(base) = self.as_historized().and_then(|d| d.versioning.base.as_ref()) {
            ids.extend(base.attachments.content_ids());
        }
        ids.sort();
        ids.dedup();
        ids
    }

    /// Convert to a historized document seeded at a public `1.0`.
    pub fn into_historized(self) -> Document {
        match self {
            Document::Simple(mut state) => {
                state.public = true;
                let mut doc = HistorizedDocument::new(state);
                doc.versioning.version = FunctionalVersion::new(1, 0);
                Document::Historized(doc)
            }
            historized => historized,
        }
    }

    /// Convert to a simple document, dropping all version state.
    pub fn into_simple(self) -> Document {
        match self {
            Document::Historized(doc) => Document::Simple(doc.state),
            simple => simple,
        }
    }
}
