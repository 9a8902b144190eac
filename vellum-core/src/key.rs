//! Identity and path model.
//!
//! A document is identified by an opaque [`Uuid`]. Its [`DocumentKey`] also
//! carries the container it currently lives in and, for documents migrated
//! from the legacy numeric scheme, the legacy id. Keys compare by `id` only:
//! the container is a location, not part of the identity.
//!
//! ```text
//!  /<container>/<type folder>/<node name>
//!  /kmelia73   /attachments  /simpledoc_1
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ModelError;

/// User identifier as handed over by the caller.
pub type UserId = String;

/// Key of a document: opaque id plus its current location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Opaque document id
    pub id: Uuid,
    /// Container the document currently lives in
    pub container_id: String,
    /// Legacy numeric id, kept for backward-compatible lookups
    pub legacy_id: Option<i64>,
}

impl DocumentKey {
    pub fn new(id: Uuid, container_id: impl Into<String>) -> Self {
        Self {
            id,
            container_id: container_id.into(),
            legacy_id: None,
        }
    }

    pub fn with_legacy_id(mut self, legacy_id: i64) -> Self {
        self.legacy_id = Some(legacy_id);
        self
    }

    /// Same identity, different location.
    pub fn relocated(&self, container_id: impl Into<String>) -> Self {
        Self {
            id: self.id,
            container_id: container_id.into(),
            legacy_id: self.legacy_id,
        }
    }
}

impl PartialEq for DocumentKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DocumentKey {}

impl Hash for DocumentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.container_id)
    }
}

/// Reference to the business object owning a set of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignRef {
    pub foreign_id: String,
    pub container_id: String,
}

impl ForeignRef {
    pub fn new(foreign_id: impl Into<String>, container_id: impl Into<String>) -> Self {
        Self {
            foreign_id: foreign_id.into(),
            container_id: container_id.into(),
        }
    }
}

/// Kind of content a document holds for its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentType {
    Attachment,
    Form,
    Image,
    Video,
    Wysiwyg,
    Node,
}

impl DocumentType {
    /// Folder segment used in repository paths.
    pub fn folder_name(self) -> &'static str {
        match self {
            DocumentType::Attachment => "attachments",
            DocumentType::Form => "forms",
            DocumentType::Image => "images",
            DocumentType::Video => "video",
            DocumentType::Wysiwyg => "wysiwyg",
            DocumentType::Node => "node",
        }
    }

    pub fn from_folder_name(folder: &str) -> Option<Self> {
        match folder {
            "attachments" => Some(DocumentType::Attachment),
            "forms" => Some(DocumentType::Form),
            "images" => Some(DocumentType::Image),
            "video" => Some(DocumentType::Video),
            "wysiwyg" => Some(DocumentType::Wysiwyg),
            "node" => Some(DocumentType::Node),
            _ => None,
        }
    }
}

impl FromStr for DocumentType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attachment" => Ok(DocumentType::Attachment),
            "form" => Ok(DocumentType::Form),
            "image" => Ok(DocumentType::Image),
            "video" => Ok(DocumentType::Video),
            "wysiwyg" => Ok(DocumentType::Wysiwyg),
            "node" => Ok(DocumentType::Node),
            other => Err(ModelError::UnknownDocumentType(other.to_string())),
        }
    }
}

/// Where the legacy numeric id of a document comes from.
///
/// Legacy plain attachments and legacy version-managed documents were
/// numbered by two independent sequences, so the same number can exist
/// twice in one container. The origin keeps their node names apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LegacyOrigin {
    /// Numbered by this store
    #[default]
    Native,
    /// Migrated plain attachment
    Attachment,
    /// Migrated version-managed document
    Versioning,
}

impl LegacyOrigin {
    pub fn prefix(self) -> &'static str {
        match self {
            LegacyOrigin::Native => "simpledoc_",
            LegacyOrigin::Attachment => "attachment_",
            LegacyOrigin::Versioning => "version_",
        }
    }

    /// Deterministic node name for a legacy id.
    pub fn node_name(self, legacy_id: i64) -> String {
        format!("{}{legacy_id}", self.prefix())
    }

    /// Recover the origin from a node name.
    pub fn of_node_name(node_name: &str) -> Self {
        if node_name.starts_with(LegacyOrigin::Versioning.prefix()) {
            LegacyOrigin::Versioning
        } else if node_name.starts_with(LegacyOrigin::Attachment.prefix()) {
            LegacyOrigin::Attachment
        } else {
            LegacyOrigin::Native
        }
    }
}

/// Repository path of a node.
pub fn repository_path(container_id: &str, document_type: DocumentType, node_name: &str) -> String {
    format!("/{container_id}/{}/{node_name}", document_type.folder_name())
}
