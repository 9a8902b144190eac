//! Vellum store: versioned multilingual document repository.
//!
//! Architecture:
//! ```text
//! ┌────────────────────┐  read   ┌─────────────┐
//! │ DocumentRepository │ ◄─────► │ HeaderCache │ (LRU, invalidated on write)
//! └─────────┬──────────┘         └─────────────┘
//!           │ ChangeSet (atomic)
//!           ▼
//! ┌────────────────────┐
//! │ NodeStore          │ MemoryNodeStore | RocksNodeStore
//! │ nodes / paths /    │
//! │ versions / content │
//! └────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod node;
pub mod query;
pub mod repository;

pub use cache::{CacheStats, HeaderCache};
pub use config::RepositoryConfig;
pub use error::{RepositoryError, Result};
pub use node::{ChangeSet, MemoryNodeStore, NodeOp, NodeStore, RocksNodeStore, StoreConfig, StoreError};
pub use repository::{clamp_range, DocumentPatch, DocumentRepository, NewDocument};
