//! LRU cache of live document records.
//!
//! Owned by the repository. Every mutating operation invalidates the ids it
//! touches before committing, so a cached record is never newer or older
//! than the store's.

use lru::LruCache;
use std::cell::{Cell, RefCell};
use std::num::NonZeroUsize;
use uuid::Uuid;
use vellum_core::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

pub struct HeaderCache {
    /// `None` when caching is disabled
    entries: Option<RefCell<LruCache<Uuid, Document>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl HeaderCache {
    /// A capacity of 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| RefCell::new(LruCache::new(cap))),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Document> {
        let entries = self.entries.as_ref()?;
        match entries.borrow_mut().get(&id) {
            Some(document) => {
                log::trace!("Header cache hit for {id}");
                self.hits.set(self.hits.get() + 1);
                Some(document.clone())
            }
            None => {
                log::trace!("Header cache miss for {id}");
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    pub fn put(&self, document: &Document) {
        if let Some(entries) = &self.entries {
            entries.borrow_mut().put(document.id(), document.clone());
        }
    }

    pub fn invalidate(&self, id: Uuid) {
        if let Some(entries) = &self.entries {
            entries.borrow_mut().pop(&id);
        }
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.borrow_mut().clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        let (len, capacity) = self
            .entries
            .as_ref()
            .map_or((0, 0), |e| {
                let e = e.borrow();
                (e.len(), e.cap().get())
            });
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            len,
            capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::{DocumentKey, DocumentState, DocumentType};

    fn document() -> Document {
        Document::Simple(DocumentState::new(
            DocumentKey::new(Uuid::new_v4(), "kmelia73"),
            "simpledoc_1",
            "node18",
            DocumentType::Attachment,
            "0",
        ))
    }

    #[test]
    fn test_hit_miss_accounting() {
        let cache = HeaderCache::new(4);
        let doc = document();
        assert!(cache.get(doc.id()).is_none());
        cache.put(&doc);
        assert_eq!(cache.get(doc.id()), Some(doc.clone()));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.len, 1);
        assert_eq!(stats.capacity, 4);
    }

    #[test]
    fn test_invalidate_and_eviction() {
        let cache = HeaderCache::new(2);
        let docs: Vec<Document> = (0..3).map(|_| document()).collect();
        for doc in &docs {
            cache.put(doc);
        }
        assert!(cache.get(docs[0].id()).is_none());
        assert!(cache.get(docs[2].id()).is_some());

        cache.invalidate(docs[2].id());
        assert!(cache.get(docs[2].id()).is_none());
        cache.clear();
        assert_eq!(cache.stats().len, 0);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache = HeaderCache::new(0);
        let doc = document();
        cache.put(&doc);
        assert!(cache.get(doc.id()).is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
