//! Version numbering and history.
//!
//! Two numbering schemes coexist on a historized document:
//!
//! ```text
//!  technical   0 ── 1 ── 2 ── 3 ── 4 ── 5 ── (live, index 6)
//!  functional 0.1  0.1  0.1  0.2  0.2  0.3       1.0
//!              └─────┬──────┘  └─┬─┘  │
//!                  one step    one step  one step
//! ```
//!
//! Every committed mutation freezes the previous state into a [`VersionEntry`]
//! appended to the [`History`] arena, so `history.len() == version_index`.
//! The functional history is derived, never stored: walking newest to
//! oldest, an entry is kept when its `major.minor` differs from the last
//! kept one (starting from the live version).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::attachment::Attachments;
use crate::document::{DocumentState, Role};
use crate::key::{DocumentKey, UserId};

/// The `major.minor` pair exposed to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FunctionalVersion {
    pub major: u32,
    pub minor: u32,
}

impl FunctionalVersion {
    pub const ZERO: FunctionalVersion = FunctionalVersion { major: 0, minor: 0 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Version of a freshly created historized document.
    pub fn initial(public: bool) -> Self {
        if public {
            Self::new(1, 0)
        } else {
            Self::new(0, 1)
        }
    }

    /// Version after a commit. Publishing bumps `major`, anything else `minor`.
    pub fn next(self, public: bool) -> Self {
        if public {
            Self::new(self.major + 1, 0)
        } else {
            Self::new(self.major, self.minor + 1)
        }
    }
}

impl fmt::Display for FunctionalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Immutable snapshot of a historized document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Id of the frozen snapshot itself
    pub id: Uuid,
    /// Version master the chain is anchored to
    pub master_id: Uuid,
    pub version_index: u32,
    pub version: FunctionalVersion,
    pub public: bool,
    pub order: i32,
    pub forbidden_download_roles: Option<BTreeSet<Role>>,
    pub displayable_as_content: bool,
    pub editable_simultaneously: Option<bool>,
    pub attachments: Attachments,
    pub comment: Option<String>,
    /// Key of the document when this snapshot was authored
    pub real_key: DocumentKey,
    /// Owner of the document when this snapshot was authored
    pub real_foreign_id: String,
    pub frozen_by: Option<UserId>,
    pub frozen_at: DateTime<Utc>,
}

impl VersionEntry {
    /// Freeze `state` at `version_index`.
    pub fn freeze(
        state: &DocumentState,
        master_id: Uuid,
        version_index: u32,
        version: FunctionalVersion,
        frozen_by: Option<UserId>,
        frozen_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            master_id,
            version_index,
            version,
            public: state.public,
            order: state.order,
            forbidden_download_roles: state.forbidden_download_roles.clone(),
            displayable_as_content: state.displayable_as_content,
            editable_simultaneously: state.editable_simultaneously,
            attachments: state.attachments.clone(),
            comment: state.comment.clone(),
            real_key: state.key.clone(),
            real_foreign_id: state.foreign_id.clone(),
            frozen_by,
            frozen_at,
        }
    }

    /// Key under which this entry is reachable now, given the live key.
    pub fn pk(&self, live: &DocumentKey) -> DocumentKey {
        DocumentKey {
            id: self.id,
            container_id: live.container_id.clone(),
            legacy_id: live.legacy_id,
        }
    }

    /// Key under which this entry's content was authored.
    pub fn real_version_pk(&self) -> DocumentKey {
        DocumentKey {
            id: self.id,
            container_id: self.real_key.container_id.clone(),
            legacy_id: self.real_key.legacy_id,
        }
    }

    /// Clone into another chain, re-anchored at `key`/`foreign_id`.
    ///
    /// The clone gets a fresh id; content references and timestamps are kept.
    pub fn cloned_into(&self, master_id: Uuid, key: &DocumentKey, foreign_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            master_id,
            real_key: key.clone(),
            real_foreign_id: foreign_id.to_string(),
            ..self.clone()
        }
    }
}

/// Technical history of one version master, oldest first.
///
/// Entry `i` has `version_index == i`; "previous" and "last public" are
/// index lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<VersionEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries in any order; they are sorted by index.
    pub fn from_entries(mut entries: Vec<VersionEntry>) -> Self {
        entries.sort_by_key(|e| e.version_index);
        Self { entries }
    }

    pub fn push(&mut self, entry: VersionEntry) {
        debug_assert_eq!(entry.version_index as usize, self.entries.len());
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, version_index: u32) -> Option<&VersionEntry> {
        self.entries.get(version_index as usize)
    }

    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &VersionEntry> {
        self.entries.iter().rev()
    }

    /// Entry right before the live state.
    pub fn latest(&self) -> Option<&VersionEntry> {
        self.entries.last()
    }

    /// Entry preceding `version_index`.
    pub fn previous(&self, version_index: u32) -> Option<&VersionEntry> {
        version_index.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Most recent public entry.
    pub fn last_public(&self) -> Option<&VersionEntry> {
        self.entries.iter().rev().find(|e| e.public)
    }

    /// Functional history, newest first.
    pub fn functional(&self, live: FunctionalVersion) -> Vec<&VersionEntry> {
        let mut kept = Vec::new();
        let mut last = live;
        for entry in self.newest_first() {
            if entry.version != last {
                last = entry.version;
                kept.push(entry);
            }
        }
        kept
    }

    pub fn into_entries(self) -> Vec<VersionEntry> {
        self.entries
    }
}
