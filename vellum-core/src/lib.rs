//! Vellum core: the data model of the versioned multilingual document store.
//!
//! Pure types and policies, no I/O:
//! - [`key`]: document identity, containers, repository paths
//! - [`attachment`]: per-language content metadata with fallback
//! - [`document`]: simple and historized documents
//! - [`version`]: functional versions, frozen entries, history arena
//! - [`ordering`]: sibling order allocation
//! - [`lock`]: unlock options

pub mod attachment;
pub mod document;
pub mod error;
pub mod key;
pub mod lock;
pub mod ordering;
pub mod version;

pub use attachment::{Attachment, AttachmentBuilder, Attachments};
pub use document::{Document, DocumentState, HistorizedDocument, Role, VersionState};
pub use error::ModelError;
pub use key::{repository_path, DocumentKey, DocumentType, ForeignRef, LegacyOrigin, UserId};
pub use lock::{UnlockOption, UnlockOptions};
pub use ordering::{OrderPolicy, SortDirection, DESCENDING_REORDER_BASE};
pub use version::{FunctionalVersion, History, VersionEntry};
