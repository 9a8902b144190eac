//! Read-only listings.
//!
//! Dates compare at day granularity. Listings never fail on missing data:
//! nothing matching yields an empty list.

use chrono::{DateTime, NaiveDate, Utc};
use vellum_core::{Document, DocumentType, ForeignRef};

use crate::error::Result;
use crate::node::NodeStore;
use crate::repository::DocumentRepository;

fn day(date: &DateTime<Utc>) -> NaiveDate {
    date.date_naive()
}

impl<S: NodeStore> DocumentRepository<S> {
    /// Documents of an owner, in listing order.
    pub fn list_by_foreign_key(&self, owner: &ForeignRef, language: &str) -> Result<Vec<Document>> {
        let documents = self.siblings(&owner.container_id, &owner.foreign_id, None)?;
        self.sorted(documents, language)
    }

    pub fn list_by_foreign_key_and_type(
        &self,
        owner: &ForeignRef,
        document_type: DocumentType,
        language: &str,
    ) -> Result<Vec<Document>> {
        let documents = self.siblings(&owner.container_id, &owner.foreign_id, Some(document_type))?;
        self.sorted(documents, language)
    }

    /// Documents of a container checked out by `owner`.
    pub fn list_by_owner(&self, container_id: &str, owner: &str, language: &str) -> Result<Vec<Document>> {
        self.select(language, |d| {
            d.key().container_id == container_id && d.editor() == Some(owner)
        })
    }

    /// Documents whose alert day is on or before `date`.
    pub fn list_requiring_warning(&self, date: DateTime<Utc>, language: &str) -> Result<Vec<Document>> {
        let threshold = day(&date);
        self.select(language, |d| {
            d.state().alert_date.is_some_and(|alert| day(&alert) <= threshold)
        })
    }

    /// Documents expiring on `date`.
    pub fn list_expiring(&self, date: DateTime<Utc>, language: &str) -> Result<Vec<Document>> {
        let threshold = day(&date);
        self.select(language, |d| {
            d.state().expiry_date.is_some_and(|expiry| day(&expiry) == threshold)
        })
    }

    /// Checked-out documents that expired before `date`.
    pub fn list_locked_requiring_unlock(&self, date: DateTime<Utc>, language: &str) -> Result<Vec<Document>> {
        let threshold = day(&date);
        self.select(language, |d| {
            d.is_checked_out()
                && d.state().expiry_date.is_some_and(|expiry| day(&expiry) < threshold)
        })
    }

    /// Smallest and largest order among siblings of one type.
    pub fn min_max_order_indexes(
        &self,
        container_id: &str,
        foreign_id: &str,
        document_type: DocumentType,
    ) -> Result<Option<(i32, i32)>> {
        let orders = self
            .siblings(container_id, foreign_id, Some(document_type))?
            .into_iter()
            .map(|d| d.state().order);
        Ok(orders.fold(None, |acc, order| match acc {
            None => Some((order, order)),
            Some((min, max)) => Some((min.min(order), max.max(order))),
        }))
    }

    fn select(&self, language: &str, keep: impl Fn(&Document) -> bool) -> Result<Vec<Document>> {
        let documents: Vec<Document> = self.store().scan_nodes()?.into_iter().filter(|d| keep(d)).collect();
        self.sorted(documents, language)
    }

    fn sorted(&self, mut documents: Vec<Document>, language: &str) -> Result<Vec<Document>> {
        let policy = self.config().order_policy();
        documents.sort_by_key(|d| {
            let state = d.state();
            policy.sort_key(state.order, state.key.legacy_id.unwrap_or_default())
        });
        documents
            .into_iter()
            .map(|d| self.hydrate(d, language))
            .collect()
    }
}
